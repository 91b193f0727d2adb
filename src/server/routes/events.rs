use crate::core::ingest::{IngestOutcome, RawEventPayload};
use crate::errors::AppResult;
use crate::server::AppState;
use crate::server::identity::Identity;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;

/// 201 for a new event, 200 when an existing one was returned by dedup.
pub async fn record_event(
    State(state): State<AppState>,
    Identity(actor): Identity,
    body: Bytes,
) -> AppResult<(StatusCode, Json<IngestOutcome>)> {
    // Parsed by hand so malformed JSON gets the same error shape as everything else.
    let payload: RawEventPayload = serde_json::from_slice(&body)?;
    let submission = payload.validate(Utc::now())?;

    let outcome = state.ingest(actor, submission).await?;

    let status = if outcome.deduped {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}
