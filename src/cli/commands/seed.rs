use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::seed::{Fixture, apply_fixture};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{field, success};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Seed { file } = cmd {
        let fixture = Fixture::from_file(file)?;
        let mut pool = DbPool::open_migrated(&cfg.database)?;

        let summary = apply_fixture(&mut pool.conn, &fixture, &file.display().to_string())?;

        success(format!("Fixture imported from {}", file.display()));
        field("memberships", summary.memberships);
        field("profiles", summary.profiles);
        field("projects", summary.projects);
        field("shifts", summary.shifts);
    }

    Ok(())
}
