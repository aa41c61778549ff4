//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Repositories refuse connections that are not fully migrated.
//! - Read paths reject invalid persisted state instead of masking it.
//! - APIs return semantic errors (`NotFound`, `Conflict`, `CapacityExceeded`)
//!   in addition to DB transport errors.

pub mod catalog_repo;
pub mod notification_repo;
pub mod user_repo;
pub mod vehicle_repo;

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Identifies the record a `NotFound` or `Conflict` refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Vehicle(Uuid),
    User(Uuid),
    Username(String),
    MasterMaterial(Uuid),
    MasterTool(Uuid),
    VehicleMaterial { vehicle_id: Uuid, item_id: Uuid },
    VehicleTool { vehicle_id: Uuid, item_id: Uuid },
    Defect { vehicle_id: Uuid, index: usize },
    Notification(Uuid),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vehicle(id) => write!(f, "vehicle {id}"),
            Self::User(id) => write!(f, "user {id}"),
            Self::Username(name) => write!(f, "username `{name}`"),
            Self::MasterMaterial(id) => write!(f, "catalog material {id}"),
            Self::MasterTool(id) => write!(f, "catalog tool {id}"),
            Self::VehicleMaterial {
                vehicle_id,
                item_id,
            } => write!(f, "material {item_id} on vehicle {vehicle_id}"),
            Self::VehicleTool {
                vehicle_id,
                item_id,
            } => write!(f, "tool {item_id} on vehicle {vehicle_id}"),
            Self::Defect { vehicle_id, index } => {
                write!(f, "defect #{index} on vehicle {vehicle_id}")
            }
            Self::Notification(id) => write!(f, "notification {id}"),
        }
    }
}

/// Repository error shared by all fleet aggregates.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Validation(ValidationError),
    NotFound(EntityRef),
    /// Unique key already taken.
    Conflict(EntityRef),
    /// Target vehicle already holds `capacity` operators.
    CapacityExceeded { vehicle_id: Uuid, capacity: u32 },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(entity) => write!(f, "{entity} already exists"),
            Self::CapacityExceeded {
                vehicle_id,
                capacity,
            } => write!(
                f,
                "vehicle {vehicle_id} already has {capacity} operators assigned"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Table name plus the columns a repository reads or writes.
pub(crate) type TableRequirement = (&'static str, &'static [&'static str]);

/// Verifies migration version, tables and columns before a repository is handed out.
pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    requirements: &[TableRequirement],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in requirements {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_count(value: i64, column: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("invalid count value `{value}` in {column}"))
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Maps a UNIQUE/PRIMARY KEY violation onto `Conflict`.
pub(crate) fn map_unique_violation(err: rusqlite::Error, entity: EntityRef) -> RepoError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RepoError::Conflict(entity)
        }
        _ => err.into(),
    }
}
