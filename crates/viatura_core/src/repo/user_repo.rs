//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist accounts, credentials, edit permissions and login counters.
//! - Own operator-to-vehicle assignment with the capacity check.
//!
//! # Invariants
//! - `username` is unique.
//! - A user is assigned to at most one vehicle (single nullable column).
//! - Capacity check and reassignment run in one immediate transaction.

use crate::model::user::{PasswordDigest, User, UserId, UserRole};
use crate::model::vehicle::VehicleId;
use crate::repo::{
    bool_to_int, ensure_connection_ready, map_unique_violation, parse_bool, parse_count,
    parse_optional_uuid, parse_uuid, EntityRef, RepoError, RepoResult, TableRequirement,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use serde::Serialize;
use uuid::Uuid;

const REQUIRED_SCHEMA: &[TableRequirement] = &[
    (
        "users",
        &[
            "uuid",
            "username",
            "name",
            "email",
            "role",
            "password_salt",
            "password_hash",
            "assigned_vehicle_uuid",
            "assignment_seq",
            "can_edit",
            "failed_login_count",
        ],
    ),
    ("vehicles", &["uuid"]),
];

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    username,
    name,
    email,
    role,
    assigned_vehicle_uuid
FROM users";

/// Account to insert, with credentials already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInsert {
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub password: PasswordDigest,
}

/// Stored account plus credential data for login checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub user: User,
    pub password: PasswordDigest,
    pub failed_login_count: u32,
}

/// Query options for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    /// Case-insensitive substring match on `name`.
    pub name_contains: Option<String>,
}

/// Effect of a reassignment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssignmentChange {
    pub previous: Option<VehicleId>,
    pub current: Option<VehicleId>,
}

impl AssignmentChange {
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }
}

/// Repository interface for user accounts.
pub trait UserRepository {
    /// Inserts an account. `Conflict` when the username is taken.
    fn create_user(&self, user: &UserInsert) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    fn get_user_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>>;
    /// Lists users ordered by name.
    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>>;
    /// Moves `user_id` to `vehicle_id` (or unassigns with `None`).
    ///
    /// Returns `CapacityExceeded` when the target already holds `capacity`
    /// other operators. Re-selecting the current vehicle is a no-op.
    fn reassign_operator(
        &self,
        user_id: UserId,
        vehicle_id: Option<VehicleId>,
        capacity: u32,
    ) -> RepoResult<AssignmentChange>;
    fn set_edit_permission(&self, user_id: UserId, can_edit: bool) -> RepoResult<()>;
    /// `None` when the permission was never set explicitly.
    fn edit_permission(&self, user_id: UserId) -> RepoResult<Option<bool>>;
    /// Increments and returns the failed-login counter. `None` for unknown usernames.
    fn record_failed_login(&self, username: &str) -> RepoResult<Option<u32>>;
    fn reset_failed_logins(&self, user_id: UserId) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &UserInsert) -> RepoResult<User> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO users (
                    uuid,
                    username,
                    name,
                    email,
                    role,
                    password_salt,
                    password_hash
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    id.to_string(),
                    user.username.as_str(),
                    user.name.as_str(),
                    user.email.as_str(),
                    user.role.as_str(),
                    user.password.salt.as_str(),
                    user.password.hash.as_str(),
                ],
            )
            .map_err(|err| map_unique_violation(err, EntityRef::Username(user.username.clone())))?;

        Ok(User {
            id,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            assigned_vehicle_id: None,
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                [username.trim()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn get_user_credentials(&self, username: &str) -> RepoResult<Option<UserCredentials>> {
        self.conn
            .query_row(
                "SELECT
                    uuid,
                    username,
                    name,
                    email,
                    role,
                    assigned_vehicle_uuid,
                    password_salt,
                    password_hash,
                    failed_login_count
                 FROM users
                 WHERE username = ?1;",
                [username.trim()],
                |row| {
                    Ok(parse_user_row(row).and_then(|user| {
                        Ok(UserCredentials {
                            user,
                            password: PasswordDigest {
                                salt: row.get("password_salt")?,
                                hash: row.get("password_hash")?,
                            },
                            failed_login_count: parse_count(
                                row.get("failed_login_count")?,
                                "users.failed_login_count",
                            )?,
                        })
                    }))
                },
            )
            .optional()?
            .transpose()
    }

    fn list_users(&self, query: &UserListQuery) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(role) = query.role {
            sql.push_str(" AND role = ?");
            bind_values.push(Value::Text(role.as_str().to_string()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let needle = query
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase);

        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            let user = parse_user_row(row)?;
            // SQLite LIKE folds ASCII only; names carry accents.
            if let Some(needle) = needle.as_deref() {
                if !user.name.to_lowercase().contains(needle) {
                    continue;
                }
            }
            users.push(user);
        }
        Ok(users)
    }

    fn reassign_operator(
        &self,
        user_id: UserId,
        vehicle_id: Option<VehicleId>,
        capacity: u32,
    ) -> RepoResult<AssignmentChange> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let user_key = user_id.to_string();

        let previous_text: Option<Option<String>> = tx
            .query_row(
                "SELECT assigned_vehicle_uuid FROM users WHERE uuid = ?1;",
                [user_key.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let previous = match previous_text {
            Some(value) => parse_optional_uuid(value, "users.assigned_vehicle_uuid")?,
            None => return Err(RepoError::NotFound(EntityRef::User(user_id))),
        };

        let change = AssignmentChange {
            previous,
            current: vehicle_id,
        };
        if change.is_noop() {
            return Ok(change);
        }

        match vehicle_id {
            Some(target) => {
                let target_key = target.to_string();
                if !vehicle_exists_in_tx(&tx, &target_key)? {
                    return Err(RepoError::NotFound(EntityRef::Vehicle(target)));
                }
                let occupied: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM users WHERE assigned_vehicle_uuid = ?1;",
                    [target_key.as_str()],
                    |row| row.get(0),
                )?;
                if occupied >= i64::from(capacity) {
                    return Err(RepoError::CapacityExceeded {
                        vehicle_id: target,
                        capacity,
                    });
                }
                tx.execute(
                    "UPDATE users
                     SET
                        assigned_vehicle_uuid = ?2,
                        assignment_seq = (
                            SELECT COALESCE(MAX(assignment_seq), 0) + 1 FROM users
                        )
                     WHERE uuid = ?1;",
                    params![user_key.as_str(), target_key.as_str()],
                )?;
            }
            None => {
                tx.execute(
                    "UPDATE users
                     SET assigned_vehicle_uuid = NULL, assignment_seq = NULL
                     WHERE uuid = ?1;",
                    [user_key.as_str()],
                )?;
            }
        }

        tx.commit()?;
        Ok(change)
    }

    fn set_edit_permission(&self, user_id: UserId, can_edit: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET can_edit = ?2 WHERE uuid = ?1;",
            params![user_id.to_string(), bool_to_int(can_edit)],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::User(user_id)));
        }
        Ok(())
    }

    fn edit_permission(&self, user_id: UserId) -> RepoResult<Option<bool>> {
        let stored: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT can_edit FROM users WHERE uuid = ?1;",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(value) => value
                .map(|flag| parse_bool(flag, "users.can_edit"))
                .transpose(),
            None => Err(RepoError::NotFound(EntityRef::User(user_id))),
        }
    }

    fn record_failed_login(&self, username: &str) -> RepoResult<Option<u32>> {
        let attempts: Option<i64> = self
            .conn
            .query_row(
                "UPDATE users
                 SET failed_login_count = failed_login_count + 1
                 WHERE username = ?1
                 RETURNING failed_login_count;",
                [username.trim()],
                |row| row.get(0),
            )
            .optional()?;
        attempts
            .map(|value| parse_count(value, "users.failed_login_count"))
            .transpose()
    }

    fn reset_failed_logins(&self, user_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET failed_login_count = 0 WHERE uuid = ?1;",
            [user_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::User(user_id)));
        }
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;
    let assigned_vehicle_id = parse_optional_uuid(
        row.get("assigned_vehicle_uuid")?,
        "users.assigned_vehicle_uuid",
    )?;

    if role == UserRole::Admin && assigned_vehicle_id.is_some() {
        return Err(RepoError::InvalidData(format!(
            "admin user {uuid_text} must not have a vehicle assignment"
        )));
    }

    Ok(User {
        id: parse_uuid(&uuid_text, "users.uuid")?,
        username: row.get("username")?,
        name: row.get("name")?,
        email: row.get("email")?,
        role,
        assigned_vehicle_id,
    })
}

fn vehicle_exists_in_tx(tx: &Transaction<'_>, vehicle_key: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM vehicles WHERE uuid = ?1);",
        [vehicle_key],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
