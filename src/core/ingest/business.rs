//! Decide which business an incoming event belongs to.

use crate::errors::{AppError, AppResult};
use crate::models::{Shift, Site};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessSource {
    Shift,
    Project,
    Context,
}

impl BusinessSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessSource::Shift => "shift",
            BusinessSource::Project => "project",
            BusinessSource::Context => "context",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessResolution {
    pub business_id: String,
    pub source: BusinessSource,
    /// The request context did not supply the business that was used.
    pub used_fallback: bool,
    /// The request context named a different business than the shift record.
    pub context_mismatch: bool,
}

/// Shift record first (authoritative), then request context, then the
/// project's own business.
pub fn resolve_business(
    context: Option<&str>,
    shift: Option<&Shift>,
    project: Option<&Site>,
) -> AppResult<BusinessResolution> {
    let context = context.map(str::trim).filter(|s| !s.is_empty());

    if let Some(shift) = shift {
        let matches_context = context == Some(shift.business_id.as_str());
        return Ok(BusinessResolution {
            business_id: shift.business_id.clone(),
            source: BusinessSource::Shift,
            used_fallback: !matches_context,
            context_mismatch: context.is_some() && !matches_context,
        });
    }

    if let Some(ctx) = context {
        return Ok(BusinessResolution {
            business_id: ctx.to_string(),
            source: BusinessSource::Context,
            used_fallback: false,
            context_mismatch: false,
        });
    }

    if let Some(project) = project {
        return Ok(BusinessResolution {
            business_id: project.business_id.clone(),
            source: BusinessSource::Project,
            used_fallback: true,
            context_mismatch: false,
        });
    }

    Err(AppError::not_found("business", "no shift, context or project to resolve from"))
}

/// Look a shift up, retrying a bounded number of times: a client may report
/// a clock-in event before the shift row it belongs to has been committed.
///
/// `fetch` runs once per attempt and nothing is held across the delay, so a
/// caller sharing one connection can lock it inside `fetch` only.
pub fn lookup_shift_with_retry<F>(
    mut fetch: F,
    shift_id: &str,
    attempts: u32,
    delay: Duration,
) -> AppResult<Shift>
where
    F: FnMut(&str) -> AppResult<Option<Shift>>,
{
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        match fetch(shift_id) {
            Ok(Some(shift)) => return Ok(shift),
            Ok(None) => {
                tracing::debug!(shift_id, attempt, "shift not found yet");
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(shift_id, attempt, error = %e, "shift lookup failed");
            }
            Err(e) => return Err(e),
        }

        if attempt < attempts && !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    Err(AppError::not_found("time_entry", shift_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn shift(business: &str) -> Shift {
        Shift {
            id: "s1".into(),
            business_id: business.into(),
            employee_id: "e1".into(),
            project_id: "p1".into(),
            clock_in: Utc::now(),
            clock_out: None,
            duration_seconds: None,
            clock_in_position: None,
            clock_out_position: None,
        }
    }

    #[test]
    fn shift_business_wins_over_context() {
        let r = resolve_business(Some("b-ctx"), Some(&shift("b-shift")), None).unwrap();
        assert_eq!(r.business_id, "b-shift");
        assert_eq!(r.source, BusinessSource::Shift);
        assert!(r.used_fallback);
        assert!(r.context_mismatch);
    }

    #[test]
    fn matching_context_is_not_a_fallback() {
        let r = resolve_business(Some("b1"), Some(&shift("b1")), None).unwrap();
        assert!(!r.used_fallback);
        assert!(!r.context_mismatch);
    }

    #[test]
    fn nothing_to_resolve_from_is_not_found() {
        let err = resolve_business(Some("  "), None, None).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
