//! Activity, alert and access-request feed use-cases.
//!
//! # Responsibility
//! - Serve the admin feed and per-vehicle recent activity.
//! - Own unread accounting for the admin notification badge.
//!
//! # Invariants
//! - Feeds are newest first.
//! - Feed limits are normalized through `FleetConfig::normalize_feed_limit`.

use crate::config::FleetConfig;
use crate::model::notification::{Notification, NotificationKind};
use crate::model::vehicle::VehicleId;
use crate::repo::notification_repo::{NotificationQuery, NotificationRepository};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::Actor;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for feed use-cases.
#[derive(Debug)]
pub enum FeedServiceError {
    /// Feed administration requires the admin role.
    AdminOnly,
    Repo(RepoError),
}

impl Display for FeedServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdminOnly => write!(f, "only admins can read or clear the feed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FeedServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::AdminOnly => None,
        }
    }
}

impl From<RepoError> for FeedServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// One feed page plus the limit that was actually applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage {
    pub items: Vec<Notification>,
    pub applied_limit: u32,
    /// Unread entries across the whole feed.
    pub unread: u64,
}

pub struct FeedService<N: NotificationRepository, U: UserRepository> {
    notifications: N,
    users: U,
    config: FleetConfig,
}

impl<N: NotificationRepository, U: UserRepository> FeedService<N, U> {
    pub fn new(notifications: N, users: U, config: FleetConfig) -> Self {
        Self {
            notifications,
            users,
            config,
        }
    }

    /// Admin feed, optionally narrowed to one vehicle.
    pub fn admin_feed(
        &self,
        actor: &Actor,
        vehicle_id: Option<VehicleId>,
        limit: Option<u32>,
    ) -> Result<FeedPage, FeedServiceError> {
        self.ensure_admin(actor)?;
        let applied_limit = self.config.normalize_feed_limit(limit);
        let items = self.notifications.list(&NotificationQuery {
            vehicle_id,
            limit: Some(applied_limit),
            ..NotificationQuery::default()
        })?;
        Ok(FeedPage {
            items,
            applied_limit,
            unread: self.notifications.unread_count()?,
        })
    }

    /// Most recent inventory updates shown on a vehicle screen.
    pub fn vehicle_activity(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Vec<Notification>, FeedServiceError> {
        Ok(self.notifications.list(&NotificationQuery {
            vehicle_id: Some(vehicle_id),
            kind: Some(NotificationKind::Update),
            limit: Some(self.config.vehicle_activity_limit),
            ..NotificationQuery::default()
        })?)
    }

    /// Pending access requests, newest first.
    pub fn pending_requests(&self, actor: &Actor) -> Result<Vec<Notification>, FeedServiceError> {
        self.ensure_admin(actor)?;
        Ok(self.notifications.list(&NotificationQuery {
            kind: Some(NotificationKind::Request),
            ..NotificationQuery::default()
        })?)
    }

    pub fn unread_count(&self, actor: &Actor) -> Result<u64, FeedServiceError> {
        self.ensure_admin(actor)?;
        Ok(self.notifications.unread_count()?)
    }

    /// Marks the whole feed read and returns how many entries changed.
    pub fn mark_all_read(&self, actor: &Actor) -> Result<u64, FeedServiceError> {
        self.ensure_admin(actor)?;
        let changed = self.notifications.mark_all_read()?;
        info!("event=feed_mark_read module=service status=ok changed={changed}");
        Ok(changed)
    }

    /// The feed is admin-only; the role is checked against storage.
    fn ensure_admin(&self, actor: &Actor) -> Result<(), FeedServiceError> {
        match self.users.get_user(actor.id)? {
            Some(user) if user.is_admin() => Ok(()),
            _ => Err(FeedServiceError::AdminOnly),
        }
    }
}
