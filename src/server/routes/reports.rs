use crate::core::report::{RangePreset, Report, ReportQuery, build_report};
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::server::identity::Identity;
use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub business_id: Option<String>,
    pub range: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub project_id: Option<String>,
    pub employee_id: Option<String>,
}

pub async fn get_report(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(params): Query<ReportParams>,
) -> AppResult<Json<Report>> {
    let business_id = params
        .business_id
        .or_else(|| actor.active_business.clone())
        .ok_or_else(|| AppError::validation("business_id", "is required"))?;

    let range = match params.range.as_deref() {
        None => RangePreset::default(),
        Some(raw) => RangePreset::from_str_lenient(raw)
            .ok_or_else(|| AppError::validation("range", format!("unknown preset '{raw}'")))?,
    };

    let query = ReportQuery {
        business_id,
        range,
        start: params.start,
        end: params.end,
        project_id: params.project_id,
        employee_id: params.employee_id,
    };

    let report = state
        .with_db(move |pool| build_report(&pool.conn, &actor, &query, Utc::now()))
        .await?;
    Ok(Json(report))
}
