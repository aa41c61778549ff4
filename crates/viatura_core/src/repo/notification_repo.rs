//! Notification feed repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append activity/alert/request entries with storage-assigned timestamps.
//! - Serve filtered, newest-first feed pages.
//!
//! # Invariants
//! - Feed order is `created_at DESC, seq DESC` (insertion breaks ties).
//! - New entries always start unread.
//! - Only `request` entries can be resolved.

use crate::model::notification::{
    ItemType, NewNotification, Notification, NotificationId, NotificationKind,
};
use crate::model::vehicle::VehicleId;
use crate::repo::{
    bool_to_int, ensure_connection_ready, parse_bool, parse_optional_uuid, parse_uuid, EntityRef,
    RepoError, RepoResult, TableRequirement,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const REQUIRED_SCHEMA: &[TableRequirement] = &[(
    "notifications",
    &[
        "seq",
        "uuid",
        "vehicle_uuid",
        "vehicle_name",
        "message",
        "kind",
        "item_type",
        "user_uuid",
        "is_read",
        "created_at",
    ],
)];

const NOTIFICATION_COLUMNS: &str = "uuid,
    vehicle_uuid,
    vehicle_name,
    message,
    kind,
    item_type,
    user_uuid,
    is_read,
    created_at";

/// Query options for feed listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationQuery {
    pub vehicle_id: Option<VehicleId>,
    pub kind: Option<NotificationKind>,
    pub unread_only: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for the notification feed.
pub trait NotificationRepository {
    /// Stores a new unread entry and returns it with id and timestamp.
    fn append(&self, entry: &NewNotification) -> RepoResult<Notification>;
    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    fn list(&self, query: &NotificationQuery) -> RepoResult<Vec<Notification>>;
    fn unread_count(&self) -> RepoResult<u64>;
    /// Marks every entry read and returns how many changed.
    fn mark_all_read(&self) -> RepoResult<u64>;
    /// Rewrites a pending request as a read update carrying `message`.
    fn resolve_request(&self, id: NotificationId, message: &str) -> RepoResult<Notification>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn append(&self, entry: &NewNotification) -> RepoResult<Notification> {
        let id = Uuid::new_v4();
        self.conn
            .query_row(
                &format!(
                    "INSERT INTO notifications (
                        uuid,
                        vehicle_uuid,
                        vehicle_name,
                        message,
                        kind,
                        item_type,
                        user_uuid
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    RETURNING {NOTIFICATION_COLUMNS};"
                ),
                params![
                    id.to_string(),
                    entry.vehicle_id.to_string(),
                    entry.vehicle_name.as_str(),
                    entry.message.as_str(),
                    entry.kind.as_str(),
                    entry.item_type.map(ItemType::as_str),
                    entry.user_id.map(|user_id| user_id.to_string()),
                ],
                |row| Ok(parse_notification_row(row)),
            )?
    }

    fn get(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        self.conn
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_notification_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list(&self, query: &NotificationQuery) -> RepoResult<Vec<Notification>> {
        let mut sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(vehicle_id) = query.vehicle_id {
            sql.push_str(" AND vehicle_uuid = ?");
            bind_values.push(Value::Text(vehicle_id.to_string()));
        }
        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }
        if query.unread_only {
            sql.push_str(" AND is_read = 0");
        }

        sql.push_str(" ORDER BY created_at DESC, seq DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_notification_row(row)?);
        }
        Ok(items)
    }

    fn unread_count(&self) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE is_read = 0;",
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("invalid unread count `{count}`")))
    }

    fn mark_all_read(&self) -> RepoResult<u64> {
        let changed = self.conn.execute(
            "UPDATE notifications SET is_read = ?1 WHERE is_read = 0;",
            [bool_to_int(true)],
        )?;
        Ok(changed as u64)
    }

    fn resolve_request(&self, id: NotificationId, message: &str) -> RepoResult<Notification> {
        self.conn
            .query_row(
                &format!(
                    "UPDATE notifications
                     SET
                        kind = 'update',
                        is_read = 1,
                        message = ?2
                     WHERE uuid = ?1
                       AND kind = 'request'
                     RETURNING {NOTIFICATION_COLUMNS};"
                ),
                params![id.to_string(), message],
                |row| Ok(parse_notification_row(row)),
            )
            .optional()?
            .transpose()?
            .ok_or(RepoError::NotFound(EntityRef::Notification(id)))
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let uuid_text: String = row.get("uuid")?;
    let vehicle_text: String = row.get("vehicle_uuid")?;

    let kind_text: String = row.get("kind")?;
    let kind = NotificationKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid notification kind `{kind_text}` in notifications.kind"
        ))
    })?;

    let item_type = match row.get::<_, Option<String>>("item_type")? {
        Some(value) => Some(ItemType::parse(&value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid item type `{value}` in notifications.item_type"
            ))
        })?),
        None => None,
    };

    let user_id = parse_optional_uuid(row.get("user_uuid")?, "notifications.user_uuid")?;
    if kind == NotificationKind::Request && user_id.is_none() {
        return Err(RepoError::InvalidData(format!(
            "request notification {uuid_text} has no user_uuid"
        )));
    }

    Ok(Notification {
        id: parse_uuid(&uuid_text, "notifications.uuid")?,
        vehicle_id: parse_uuid(&vehicle_text, "notifications.vehicle_uuid")?,
        vehicle_name: row.get("vehicle_name")?,
        message: row.get("message")?,
        kind,
        item_type,
        user_id,
        read: parse_bool(row.get("is_read")?, "notifications.is_read")?,
        created_at: row.get("created_at")?,
    })
}
