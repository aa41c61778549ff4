//! User accounts, roles and credential helpers.
//!
//! # Invariants
//! - `username` (matrícula) is 1-6 ASCII digits and unique.
//! - Only operators carry `assigned_vehicle_id`; admins are never assigned.
//! - Plain-text passwords are never stored or logged.

use super::vehicle::VehicleId;
use super::{required_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub type UserId = Uuid;

pub const MIN_PASSWORD_CHARS: usize = 6;

static MATRICULA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{1,6}$").expect("valid matricula regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Operator,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Operator => "operator",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "operator" => Some(Self::Operator),
            _ => None,
        }
    }
}

/// Account read model. Credentials are kept out of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Employee registration number (matrícula).
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub assigned_vehicle_id: Option<VehicleId>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_assigned_to(&self, vehicle_id: VehicleId) -> bool {
        self.assigned_vehicle_id == Some(vehicle_id)
    }
}

/// Self-service registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Registration input after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Validates in the order a registration form reports problems.
    pub fn validate(&self) -> Result<NewAccount, ValidationError> {
        let name = required_text("name", &self.name)?;
        let username = validate_username(&self.username)?;
        let email = self.email.trim().to_string();
        if !EMAIL_RE.is_match(&email) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                expected: "an address like name@example.com",
            });
        }
        if self.password != self.password_confirmation {
            return Err(ValidationError::PasswordMismatch);
        }
        validate_password(&self.password)?;

        Ok(NewAccount {
            name,
            username,
            email,
            password: self.password.clone(),
        })
    }
}

/// Checks the matrícula shape and returns it trimmed.
pub fn validate_username(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if !MATRICULA_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat {
            field: "username",
            expected: "1 to 6 digits",
        });
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ValidationError::TooShort {
            field: "password",
            min_chars: MIN_PASSWORD_CHARS,
        });
    }
    Ok(())
}

/// Salted SHA-256 password digest as stored in `users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

impl PasswordDigest {
    /// Hashes `password` with a fresh random salt.
    pub fn generate(password: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let hash = digest_hex(&salt, password);
        Self { salt, hash }
    }

    pub fn verify(&self, password: &str) -> bool {
        digest_hex(&self.salt, password) == self.hash
    }
}

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::{validate_username, PasswordDigest, RegisterRequest};
    use crate::model::ValidationError;

    fn request() -> RegisterRequest {
        RegisterRequest {
            name: "João Silva".to_string(),
            username: "123456".to_string(),
            email: "joao@example.com".to_string(),
            password: "segredo1".to_string(),
            password_confirmation: "segredo1".to_string(),
        }
    }

    #[test]
    fn valid_request_passes() {
        let account = request().validate().unwrap();
        assert_eq!(account.username, "123456");
        assert_eq!(account.name, "João Silva");
    }

    #[test]
    fn username_must_be_short_digit_string() {
        assert!(validate_username("1234567").is_err());
        assert!(validate_username("12a").is_err());
        assert!(validate_username("").is_err());
        // Arabic-Indic and fullwidth digits are not matrícula digits.
        assert!(validate_username("١٢٣").is_err());
        assert!(validate_username("１２３").is_err());
        assert_eq!(validate_username(" 42 ").unwrap(), "42");
    }

    #[test]
    fn email_shape_is_checked() {
        let mut bad = request();
        bad.email = "joao@example".to_string();
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::InvalidFormat { field: "email", .. })
        ));
    }

    #[test]
    fn password_rules_apply_after_confirmation_check() {
        let mut mismatch = request();
        mismatch.password_confirmation = "outra123".to_string();
        assert_eq!(mismatch.validate(), Err(ValidationError::PasswordMismatch));

        let mut short = request();
        short.password = "abc".to_string();
        short.password_confirmation = "abc".to_string();
        assert!(matches!(
            short.validate(),
            Err(ValidationError::TooShort { field: "password", .. })
        ));
    }

    #[test]
    fn digest_verifies_only_matching_password() {
        let digest = PasswordDigest::generate("segredo1");
        assert!(digest.verify("segredo1"));
        assert!(!digest.verify("segredo2"));

        let other = PasswordDigest::generate("segredo1");
        assert_ne!(digest.salt, other.salt);
        assert_ne!(digest.hash, other.hash);
    }
}
