use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::ingest::{IngestSettings, Ingestor, RawEventPayload, RecordedEvent};
use crate::db::pool::DbPool;
use crate::errors::AppResult;
use crate::ui::messages::{field, success, warning};
use crate::utils::colors::{colorize, color_for_inside};
use crate::utils::describe_inside;
use crate::utils::time::fmt_ts;
use chrono::Utc;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Record {
        who,
        business,
        event_type,
        project,
        employee,
        shift,
        lat,
        lng,
        at,
        source,
    } = cmd
    else {
        return Ok(());
    };

    let actor = who.to_actor(business.as_deref());
    let payload = RawEventPayload {
        event_type: Some(event_type.clone()),
        project_id: Some(project.clone()),
        employee_id: employee.clone(),
        time_entry_id: shift.clone(),
        occurred_at: at.clone(),
        lat: *lat,
        lng: *lng,
        source: source.clone(),
    };

    // Validation runs before the database is even opened.
    let submission = payload.validate(Utc::now())?;

    let mut pool = DbPool::open_migrated(&cfg.database)?;
    let ingestor = Ingestor::new(IngestSettings::from_config(cfg));
    let outcome = ingestor.ingest(&mut pool.conn, &actor, submission)?;

    if outcome.deduped {
        warning("Duplicate event: an equivalent one is already stored");
    } else {
        success("Event recorded");
    }

    let (stream, kind, occurred_at) = match &outcome.event {
        RecordedEvent::Geofence(e) => ("geofence", e.event_type.to_db_str(), e.occurred_at),
        RecordedEvent::Shift(e) => ("time_entry", e.event_type.to_db_str(), e.occurred_at),
    };
    let inside = outcome.event.inside();

    field("id", outcome.event.id());
    field("stream", stream);
    field("type", kind);
    field("occurred_at", fmt_ts(&occurred_at));
    field("business", &outcome.business.business_id);
    field(
        "inside",
        colorize(describe_inside(inside), color_for_inside(inside)),
    );
    field(
        "distance",
        outcome
            .event
            .distance_m()
            .map(|d| format!("{d} m"))
            .unwrap_or_else(|| "--".to_string()),
    );

    if outcome.business.used_fallback {
        warning(format!(
            "Business resolved from the {} record, not the request context",
            outcome.business.source.as_str()
        ));
    }

    Ok(())
}
