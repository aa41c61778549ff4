//! Fleet schema migrations.
//!
//! # Invariants
//! - Step versions are strictly increasing and end at `latest_version()`.
//! - A run applies every pending step or none of them.
//! - `PRAGMA user_version` always names the last applied step.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// One schema step. `name` only shows up in errors and logs.
#[derive(Debug, Clone, Copy)]
struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "vehicles",
        sql: include_str!("0001_init.sql"),
    },
    Step {
        version: 2,
        name: "users",
        sql: include_str!("0002_users.sql"),
    },
    Step {
        version: 3,
        name: "notifications",
        sql: include_str!("0003_notifications.sql"),
    },
];

/// Schema versions before and after a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationReport {
    /// Number of steps the run applied.
    pub fn applied(&self) -> u32 {
        self.to_version - self.from_version
    }
}

pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Brings the fleet schema up to `latest_version()` inside one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationReport> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let report = MigrationReport {
        from_version,
        to_version: latest,
    };
    if report.applied() == 0 {
        return Ok(report);
    }

    let tx = conn.transaction()?;
    for step in STEPS.iter().filter(|step| step.version > from_version) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        report.from_version,
        report.to_version,
        report.applied()
    );
    Ok(report)
}

pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}
