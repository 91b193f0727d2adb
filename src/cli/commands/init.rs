use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::log;
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{success, warning};

/// Handle the `init` command
///
/// This initializes:
///  - the config directory and file (skipped with `--test`)
///  - the SQLite database
///  - all pending DB migrations
pub fn handle(cli: &Cli) -> AppResult<()> {
    let path = cli.config_path();
    let cfg = Config::init_all(cli.db.clone(), &path, cli.test)?;
    let db_path = cfg.database.clone();

    println!("⚙️  Initializing crewclock…");
    if !cli.test {
        println!("📄 Config file : {}", path.display());
    }
    println!("🗄️  Database   : {}", &db_path);

    let pool = DbPool::open_migrated(&db_path)?;

    success(format!("Database initialized at {}", &db_path));

    // The audit line is best effort.
    if let Err(e) = log::ttlog(
        &pool.conn,
        "init",
        "Database initialized",
        &format!("Database initialized at {}", &db_path),
    ) {
        warning(format!("Failed to write internal log: {}", e));
    }

    println!("🎉 crewclock initialization completed!");
    Ok(())
}
