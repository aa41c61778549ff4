//! Account registration, login and edit-permission use-cases.
//!
//! # Responsibility
//! - Validate self-service registration and create operator accounts.
//! - Verify credentials and track consecutive failed logins.
//! - Let admins grant or revoke operator edit permission.
//!
//! # Invariants
//! - Registered accounts are always operators with no vehicle.
//! - A successful login resets the failed-login counter.
//! - Log lines carry ids and counters only, never usernames or passwords.

use crate::config::FleetConfig;
use crate::model::user::{PasswordDigest, RegisterRequest, User, UserId, UserRole};
use crate::model::ValidationError;
use crate::repo::user_repo::{UserInsert, UserListQuery, UserRepository};
use crate::repo::{EntityRef, RepoError};
use crate::service::{resolve_can_edit, Actor};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for account use-cases.
#[derive(Debug)]
pub enum AccountServiceError {
    Validation(ValidationError),
    UsernameTaken(String),
    /// Unknown username or wrong password.
    InvalidCredentials {
        /// Consecutive failures recorded for this username.
        attempts: u32,
        /// True once the caller should offer a password reset.
        suggest_reset: bool,
    },
    AdminOnly,
    UserNotFound(UserId),
    /// Edit permission only applies to operators.
    NotAnOperator(UserId),
    Repo(RepoError),
}

impl Display for AccountServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UsernameTaken(username) => {
                write!(f, "username `{username}` is already registered")
            }
            Self::InvalidCredentials {
                attempts,
                suggest_reset,
            } => {
                write!(f, "invalid username or password (attempt {attempts})")?;
                if *suggest_reset {
                    write!(f, "; consider resetting the password")?;
                }
                Ok(())
            }
            Self::AdminOnly => write!(f, "only admins can manage accounts"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::NotAnOperator(id) => write!(f, "user {id} is not an operator"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccountServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccountServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Conflict(EntityRef::Username(username)) => Self::UsernameTaken(username),
            RepoError::NotFound(EntityRef::User(id)) => Self::UserNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for AccountServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub struct AccountService<U: UserRepository> {
    users: U,
    config: FleetConfig,
}

impl<U: UserRepository> AccountService<U> {
    pub fn new(users: U, config: FleetConfig) -> Self {
        Self { users, config }
    }

    /// Creates an unassigned operator from the registration form.
    pub fn register(&self, request: &RegisterRequest) -> Result<User, AccountServiceError> {
        self.create_account(request, UserRole::Operator)
    }

    /// Creates an admin account. Used when bootstrapping a fresh database.
    pub fn create_admin(&self, request: &RegisterRequest) -> Result<User, AccountServiceError> {
        self.create_account(request, UserRole::Admin)
    }

    fn create_account(
        &self,
        request: &RegisterRequest,
        role: UserRole,
    ) -> Result<User, AccountServiceError> {
        let account = request.validate()?;
        let user = self.users.create_user(&UserInsert {
            username: account.username,
            name: account.name,
            email: account.email,
            role,
            password: PasswordDigest::generate(&account.password),
        })?;
        info!(
            "event=account_create module=service status=ok user_id={} role={}",
            user.id,
            role.as_str()
        );
        Ok(user)
    }

    /// Verifies credentials and returns the signed-in user.
    pub fn login(&self, username: &str, password: &str) -> Result<User, AccountServiceError> {
        let username = username.trim();
        match self.users.get_user_credentials(username)? {
            Some(credentials) if credentials.password.verify(password) => {
                if credentials.failed_login_count > 0 {
                    self.users.reset_failed_logins(credentials.user.id)?;
                }
                info!(
                    "event=login module=service status=ok user_id={}",
                    credentials.user.id
                );
                Ok(credentials.user)
            }
            _ => {
                // Unknown usernames have no counter to bump.
                let attempts = self.users.record_failed_login(username)?.unwrap_or(0);
                let suggest_reset =
                    attempts >= self.config.login_attempts_before_reset_hint;
                warn!(
                    "event=login module=service status=error attempts={attempts} suggest_reset={suggest_reset}"
                );
                Err(AccountServiceError::InvalidCredentials {
                    attempts,
                    suggest_reset,
                })
            }
        }
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, AccountServiceError> {
        Ok(self.users.get_user_by_username(username.trim())?)
    }

    pub fn get_user(&self, id: UserId) -> Result<User, AccountServiceError> {
        self.users
            .get_user(id)?
            .ok_or(AccountServiceError::UserNotFound(id))
    }

    /// Grants or revokes inventory editing for an operator.
    pub fn set_edit_permission(
        &self,
        actor: &Actor,
        user_id: UserId,
        can_edit: bool,
    ) -> Result<(), AccountServiceError> {
        if !actor.is_admin() {
            return Err(AccountServiceError::AdminOnly);
        }
        let target = self.get_user(user_id)?;
        if target.role != UserRole::Operator {
            return Err(AccountServiceError::NotAnOperator(user_id));
        }
        self.users.set_edit_permission(user_id, can_edit)?;
        info!(
            "event=edit_permission_set module=service status=ok user_id={user_id} can_edit={can_edit}"
        );
        Ok(())
    }

    pub fn can_edit(&self, user: &User) -> Result<bool, AccountServiceError> {
        Ok(resolve_can_edit(&self.users, user)?)
    }

    /// True once at least one admin account exists.
    pub fn has_admin(&self) -> Result<bool, AccountServiceError> {
        let admins = self.users.list_users(&UserListQuery {
            role: Some(UserRole::Admin),
            name_contains: None,
        })?;
        Ok(!admins.is_empty())
    }

    /// Operators whose name contains `search`, ignoring case.
    pub fn list_operators(&self, search: Option<&str>) -> Result<Vec<User>, AccountServiceError> {
        let name_contains = search
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(self.users.list_users(&UserListQuery {
            role: Some(UserRole::Operator),
            name_contains,
        })?)
    }
}
