use crate::cli::commands::runtime;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ingest::{IngestSettings, Ingestor};
use crate::core::tracker::{
    ActiveShift, EventSink, HttpSink, LocalSink, ProximityTracker, ReplaySource, TrackerSettings,
    TrackerSummary,
};
use crate::db::pool::DbPool;
use crate::db::shifts::load_open_shifts_for_employee;
use crate::db::sites::get_site;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{field, header, info, warning};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Emissions are detached; give in-flight submissions a moment before the
/// runtime shuts down.
const SUBMIT_GRACE: Duration = Duration::from_millis(500);

async fn drive<K: EventSink + 'static>(
    settings: TrackerSettings,
    source: ReplaySource,
    sink: Arc<K>,
    shift: ActiveShift,
) -> TrackerSummary {
    let (tx, rx) = watch::channel(Some(shift));
    let summary = ProximityTracker::new(settings, source, sink).run(rx).await;
    drop(tx);

    tokio::time::sleep(SUBMIT_GRACE).await;
    summary
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Track {
        who,
        business,
        replay,
        server,
        interval_ms,
    } = cmd
    else {
        return Ok(());
    };

    let source = ReplaySource::from_file(replay)?;
    let pool = DbPool::open_migrated(&cfg.database)?;

    let open = load_open_shifts_for_employee(&pool.conn, &who.actor)?;
    let Some(shift) = open.first().cloned() else {
        return Err(AppError::not_found("open time_entry", who.actor.as_str()));
    };
    if open.len() > 1 {
        warning(format!(
            "{} open shifts found; tracking the most recent ({})",
            open.len(),
            shift.id
        ));
    }

    let site = get_site(&pool.conn, &shift.project_id)?
        .ok_or_else(|| AppError::not_found("project", shift.project_id.as_str()))?;
    if !site.has_coordinates() {
        warning(format!(
            "Project {} has no coordinates; positions will not be classified",
            site.id
        ));
    }

    let actor = who.to_actor(Some(business.as_deref().unwrap_or(shift.business_id.as_str())));

    let mut settings = TrackerSettings::from_config(cfg);
    if let Some(ms) = interval_ms {
        settings.poll_interval = Duration::from_millis((*ms).max(1));
    }

    info(format!(
        "Tracking shift {} at {} ({} readings)",
        shift.id,
        site.display_name(),
        source.remaining()
    ));

    let active = ActiveShift {
        shift_id: shift.id.clone(),
        site,
    };

    let summary = match server {
        Some(url) => {
            let sink = Arc::new(HttpSink::new(url, actor, cfg.request_timeout())?);
            runtime()?.block_on(drive(settings, source, sink, active))
        }
        None => {
            let ingestor = Arc::new(Ingestor::new(IngestSettings::from_config(cfg)));
            let sink = Arc::new(LocalSink::new(Arc::new(Mutex::new(pool)), ingestor, actor));
            runtime()?.block_on(drive(settings, source, sink, active))
        }
    };

    header("Tracking finished");
    field("ticks", summary.ticks);
    field("samples", summary.samples);
    field("skipped", summary.skipped);
    field("emitted", summary.emitted);
    field("suppressed", summary.suppressed);

    Ok(())
}
