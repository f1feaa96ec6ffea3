//! Registered site users and the forms used to create and authenticate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// A registered account.
#[derive(Serialize, Clone, FromRow, Debug)]
pub struct User {
    pub id: Uuid,

    /// Unique login name.
    pub username: String,

    pub email: String,

    /// `pbkdf2_sha256$<rounds>$<key>`.
    #[serde(skip_serializing)]
    pub password_hash: String,

    #[serde(skip_serializing)]
    pub salt: String,

    /// Grants access to the dashboard and pet management.
    pub is_staff: bool,

    pub created_at: DateTime<Utc>,
}

/// `POST /register` payload.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl RegistrationForm {
    /// Check field constraints, collecting every violation.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let username = self.username.trim();

        if username.is_empty() {
            errors.push("username: this field is required".to_string());
        } else if username.chars().count() > USERNAME_MAX_LEN {
            errors.push(format!("username: at most {USERNAME_MAX_LEN} characters"));
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.push(
                "username: letters, digits and @/./+/-/_ only".to_string(),
            );
        }

        if !is_plausible_email(&self.email) {
            errors.push("email: enter a valid email address".to_string());
        }

        if self.password1 != self.password2 {
            errors.push("password2: the two password fields didn't match".to_string());
        }
        if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.push(format!(
                "password1: must contain at least {PASSWORD_MIN_LEN} characters"
            ));
        }
        if !self.password1.is_empty() && self.password1.chars().all(|c| c.is_ascii_digit()) {
            errors.push("password1: cannot be entirely numeric".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// `POST /login` payload.
#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Loose email check: one `@` with something on both sides.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
