//! Actor extraction from trusted upstream headers.

use crate::core::tracker::sink::{HEADER_ACTOR_ID, HEADER_ACTOR_ROLE, HEADER_BUSINESS_ID};
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, ActorRole};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn actor_from_headers(headers: &HeaderMap) -> AppResult<Actor> {
    let user_id = header(headers, HEADER_ACTOR_ID).ok_or(AppError::Unauthorized)?;

    let role = match header(headers, HEADER_ACTOR_ROLE) {
        None => ActorRole::Member,
        Some(raw) => ActorRole::from_str_lenient(raw)
            .ok_or_else(|| AppError::validation("role", format!("unknown role '{raw}'")))?,
    };

    Ok(Actor {
        user_id: user_id.to_string(),
        role,
        active_business: header(headers, HEADER_BUSINESS_ID).map(str::to_string),
    })
}

/// The authenticated actor of a request.
pub struct Identity(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers).map(Identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_actor_is_unauthorized() {
        let err = actor_from_headers(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn reads_role_and_business() {
        let mut h = HeaderMap::new();
        h.insert(HEADER_ACTOR_ID, HeaderValue::from_static("u1"));
        h.insert(HEADER_ACTOR_ROLE, HeaderValue::from_static("admin"));
        h.insert(HEADER_BUSINESS_ID, HeaderValue::from_static("b1"));

        let actor = actor_from_headers(&h).unwrap();
        assert!(actor.is_elevated());
        assert_eq!(actor.active_business.as_deref(), Some("b1"));
    }
}
