//! Authorization checks against the membership table.
//!
//! Authentication itself is external: callers hand in an [`Actor`] that the
//! identity collaborator already verified.

use crate::db::members::{active_business_ids, get_membership};
use crate::errors::{AppError, AppResult};
use crate::models::{Actor, Membership};
use rusqlite::Connection;

pub(crate) fn require_actor(actor: &Actor) -> AppResult<()> {
    if actor.user_id.trim().is_empty() {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn active_membership(conn: &Connection, actor: &Actor, business_id: &str) -> AppResult<Membership> {
    let m = get_membership(conn, business_id, &actor.user_id)?.ok_or_else(|| {
        AppError::Forbidden(format!("not a member of business {business_id}"))
    })?;

    if !m.active {
        return Err(AppError::Forbidden(format!(
            "membership in business {business_id} is inactive"
        )));
    }
    Ok(m)
}

/// Event writes: admins anywhere; otherwise an active member of the business,
/// and only managers/owners may record on behalf of someone else.
pub fn authorize_event_write(
    conn: &Connection,
    actor: &Actor,
    business_id: &str,
    employee_id: &str,
) -> AppResult<()> {
    require_actor(actor)?;
    if actor.is_elevated() {
        return Ok(());
    }

    let m = active_membership(conn, actor, business_id)?;
    if employee_id != actor.user_id && !m.role.can_manage() {
        return Err(AppError::Forbidden(
            "workers may only record their own events".to_string(),
        ));
    }
    Ok(())
}

/// Report reads: admins, or active managers/owners of the business.
pub fn authorize_report_read(conn: &Connection, actor: &Actor, business_id: &str) -> AppResult<()> {
    require_actor(actor)?;
    if actor.is_elevated() {
        return Ok(());
    }

    let m = active_membership(conn, actor, business_id)?;
    if !m.role.can_manage() {
        return Err(AppError::Forbidden(
            "reports require a manager or owner role".to_string(),
        ));
    }
    Ok(())
}

/// Businesses whose sites the actor may see; `None` means all of them (admin).
pub fn accessible_businesses(conn: &Connection, actor: &Actor) -> AppResult<Option<Vec<String>>> {
    require_actor(actor)?;
    if actor.is_elevated() {
        return Ok(None);
    }
    Ok(Some(active_business_ids(conn, &actor.user_id)?))
}
