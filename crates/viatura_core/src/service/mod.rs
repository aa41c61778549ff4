//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into fleet use-cases.
//! - Enforce role, assignment and edit-permission rules for the acting user.
//! - Record activity/alert feed entries for every inventory change.
//!
//! # Invariants
//! - Services never bypass repository validation/persistence contracts.
//! - Permission checks reload the actor from storage; a stale snapshot
//!   never grants access.

pub mod account_service;
pub mod catalog_service;
pub mod feed_service;
pub mod fleet_service;
pub mod inventory_service;
pub mod messages;

use crate::model::notification::{NewNotification, Notification};
use crate::model::user::{User, UserRole};
use crate::repo::notification_repo::NotificationRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use log::{debug, error};

/// Signed-in user on whose behalf a use-case runs.
pub type Actor = User;

/// Resolves whether `user` may change inventory.
///
/// Admins always can; operators can unless the permission was explicitly
/// turned off.
pub(crate) fn resolve_can_edit<U: UserRepository>(users: &U, user: &User) -> RepoResult<bool> {
    match user.role {
        UserRole::Admin => Ok(true),
        UserRole::Operator => Ok(users.edit_permission(user.id)?.unwrap_or(true)),
    }
}

/// Appends one feed entry and emits a metadata-only log line.
pub(crate) fn record_activity<N: NotificationRepository>(
    notifications: &N,
    entry: NewNotification,
) -> RepoResult<Notification> {
    match notifications.append(&entry) {
        Ok(stored) => {
            debug!(
                "event=notification_append module=service status=ok kind={} vehicle_id={} item_type={}",
                stored.kind.as_str(),
                stored.vehicle_id,
                stored.item_type.map_or("none", |item| item.as_str())
            );
            Ok(stored)
        }
        Err(err) => {
            error!(
                "event=notification_append module=service status=error kind={} vehicle_id={} error={}",
                entry.kind.as_str(),
                entry.vehicle_id,
                err
            );
            Err(err)
        }
    }
}
