//! crewclock main entrypoint.

use crewclock::run;
use crewclock::ui::messages::error;

fn main() {
    if let Err(e) = run() {
        error(format!("Error: {}", e));
        std::process::exit(1);
    }
}
