//! Diagnostic logging setup.
//!
//! User-facing output goes through `ui::messages` on stdout; diagnostics go
//! through `tracing` on stderr so stdout stays machine-readable.

use crate::config::Config;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the config level.
/// Calling it again (e.g. from tests) is a no-op.
pub fn init_logging(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    let result = if cfg.log_format.eq_ignore_ascii_case("json") {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        tracing::debug!("logging already initialised");
    }
}
