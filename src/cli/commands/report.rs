use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::report::{ReportQuery, build_report};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::export::export_report;
use chrono::Utc;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Report {
        who,
        business,
        range,
        start,
        end,
        project,
        employee,
        format,
        file,
        force,
    } = cmd
    else {
        return Ok(());
    };

    let actor = who.to_actor(Some(business.as_str()));
    let query = ReportQuery {
        business_id: business.clone(),
        range: *range,
        start: start.clone(),
        end: end.clone(),
        project_id: project.clone(),
        employee_id: employee.clone(),
    };

    let pool = DbPool::open_migrated(&cfg.database)?;
    let report = build_report(&pool.conn, &actor, &query, Utc::now())?;

    export_report(&report, *format, file.as_deref(), *force)
}
