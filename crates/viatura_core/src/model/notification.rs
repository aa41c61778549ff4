//! Activity and alert feed entries.
//!
//! # Invariants
//! - `Request` entries carry the requesting `user_id`.
//! - Approving a request rewrites it as a read `Update`; it never stays pending.

use super::user::UserId;
use super::vehicle::VehicleId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Inventory or vehicle change.
    Update,
    /// Low stock, broken tool or reported defect.
    Alert,
    /// Operator asking for access to a vehicle.
    Request,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Alert => "alert",
            Self::Request => "request",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "update" => Some(Self::Update),
            "alert" => Some(Self::Alert),
            "request" => Some(Self::Request),
            _ => None,
        }
    }
}

/// What part of the vehicle an entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Material,
    Tool,
    Vehicle,
}

impl ItemType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Tool => "tool",
            Self::Vehicle => "vehicle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "material" => Some(Self::Material),
            "tool" => Some(Self::Tool),
            "vehicle" => Some(Self::Vehicle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub vehicle_id: VehicleId,
    /// Vehicle name at the time of the event.
    pub vehicle_name: String,
    pub message: String,
    pub kind: NotificationKind,
    pub item_type: Option<ItemType>,
    pub user_id: Option<UserId>,
    pub read: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Unsaved feed entry; storage fills id, timestamp and `read = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub vehicle_id: VehicleId,
    pub vehicle_name: String,
    pub message: String,
    pub kind: NotificationKind,
    pub item_type: Option<ItemType>,
    pub user_id: Option<UserId>,
}

impl NewNotification {
    pub fn new(
        kind: NotificationKind,
        vehicle_id: VehicleId,
        vehicle_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            vehicle_id,
            vehicle_name: vehicle_name.into(),
            message: message.into(),
            kind,
            item_type: None,
            user_id: None,
        }
    }

    pub fn about(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn from_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}
