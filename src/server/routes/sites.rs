use crate::core::site_resolver::{SiteSelection, resolve_for_actor};
use crate::errors::{AppError, AppResult};
use crate::models::Coordinate;
use crate::server::AppState;
use crate::server::identity::Identity;
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

fn coordinate_part(field: &'static str, raw: Option<&str>) -> AppResult<f64> {
    let raw = raw.ok_or_else(|| AppError::validation(field, "is required"))?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::validation(field, format!("'{raw}' is not a finite number")))
}

pub async fn resolve_site(
    State(state): State<AppState>,
    Identity(actor): Identity,
    Query(params): Query<ResolveParams>,
) -> AppResult<Json<SiteSelection>> {
    let position = Coordinate::new(
        coordinate_part("lat", params.lat.as_deref())?,
        coordinate_part("lng", params.lng.as_deref())?,
    );

    let selection = state
        .with_db(move |pool| resolve_for_actor(&pool.conn, &actor, position))
        .await?;
    Ok(Json(selection))
}
