//! User accounts and bearer-token sessions.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 with a per-user random salt;
//! hashing runs on the blocking pool. Session tokens are random, handed to
//! the client once, and only their digest is persisted.

use crate::{
    errors::{ServiceError, ServiceResult},
    models::user::{LoginForm, RegistrationForm, User},
};
use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Duration, Utc};
use pbkdf2::pbkdf2_hmac;
use rand::{RngCore, rngs::OsRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::{io, sync::Arc};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use uuid::Uuid;

const HASH_SCHEME: &str = "pbkdf2_sha256";
const PBKDF2_ROUNDS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
const USER_COLUMNS: &str = "id, username, email, password_hash, salt, is_staff, created_at";

/// Who is making a request. Anonymous when no valid session was presented.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub user: Option<User>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|user| user.is_staff)
    }

    /// Guard for actions open to any signed-in user.
    pub fn require_authenticated(&self) -> ServiceResult<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| ServiceError::Forbidden("Authentication required.".into()))
    }

    /// Guard for staff-only actions.
    pub fn require_staff(&self) -> ServiceResult<&User> {
        match &self.user {
            Some(user) if user.is_staff => Ok(user),
            _ => Err(ServiceError::Forbidden(
                "Invalid request or insufficient permissions.".into(),
            )),
        }
    }
}

/// A freshly opened session. `token` is never stored in clear.
#[derive(Serialize, Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<SqlitePool>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(db: Arc<SqlitePool>, session_ttl_hours: i64) -> Self {
        Self {
            db,
            session_ttl: Duration::hours(session_ttl_hours.max(1)),
        }
    }

    /// Create a regular (non-staff) account.
    pub async fn register(&self, form: &RegistrationForm) -> ServiceResult<User> {
        form.validate().map_err(ServiceError::ValidationFailed)?;

        let username = form.username.trim();
        let salt = new_salt();
        let password_hash = {
            let (salt, password) = (salt.clone(), form.password1.clone());
            run_blocking(move || hash_password(&salt, &password, PBKDF2_ROUNDS)).await?
        };
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: form.email.trim().to_string(),
            password_hash,
            salt,
            is_staff: false,
            created_at: Utc::now(),
        };

        match sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, salt, is_staff, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(user.is_staff)
        .bind(user.created_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => {
                info!(username = %user.username, "registered user");
                Ok(user)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(ServiceError::UsernameTaken(username.to_string()))
            }
            Err(err) => Err(ServiceError::Sqlx(err)),
        }
    }

    /// Verify credentials and open a session.
    pub async fn login(&self, form: &LoginForm) -> ServiceResult<Session> {
        let user = self
            .find_by_username(form.username.trim())
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let valid = {
            let salt = user.salt.clone();
            let password = form.password.clone();
            let stored = user.password_hash.clone();
            run_blocking(move || verify_password(&salt, &password, &stored)).await?
        };
        if !valid {
            debug!(username = %user.username, "rejected login");
            return Err(ServiceError::InvalidCredentials);
        }

        let token = new_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;
        sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_digest(&token))
        .bind(user.id)
        .bind(now)
        .bind(expires_at)
        .execute(&*self.db)
        .await?;

        info!(username = %user.username, "opened session");
        Ok(Session {
            token,
            user,
            expires_at,
        })
    }

    /// Close the session behind `token`. Returns false if it did not exist.
    pub async fn logout(&self, token: &str) -> ServiceResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_digest(token))
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolve a bearer token. Expired sessions are removed and resolve to anonymous.
    pub async fn identify(&self, token: &str) -> ServiceResult<Identity> {
        let digest = token_digest(token);
        let session = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            "SELECT user_id, expires_at FROM sessions WHERE token_hash = ?",
        )
        .bind(&digest)
        .fetch_optional(&*self.db)
        .await?;

        let Some((user_id, expires_at)) = session else {
            return Ok(Identity::anonymous());
        };
        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
                .bind(&digest)
                .execute(&*self.db)
                .await?;
            debug!(%user_id, "dropped expired session");
            return Ok(Identity::anonymous());
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(Identity { user })
    }

    /// Grant the staff role.
    pub async fn promote_staff(&self, username: &str) -> ServiceResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_staff = 1 WHERE username = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{username}`")))?;
        info!(username, "granted staff role");
        Ok(user)
    }

    pub async fn count_users(&self) -> ServiceResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&*self.db)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }
}

/// `pbkdf2_sha256$<rounds>$<base64 key>`. The salt lives in its own column.
fn hash_password(salt: &str, password: &str, rounds: u32) -> String {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut key);
    format!("{HASH_SCHEME}${rounds}${}", STANDARD_NO_PAD.encode(key))
}

/// Re-derive with the round count recorded in `stored` and compare.
fn verify_password(salt: &str, password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(HASH_SCHEME), Some(rounds), Some(_)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    let candidate = hash_password(salt, password, rounds);
    constant_time_eq(candidate.as_bytes(), stored.as_bytes())
}

/// Run CPU-heavy work off the async runtime.
async fn run_blocking<T, F>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ServiceError::Io(io::Error::other(err)))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn new_salt() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes::<16>())
}

/// 32 bytes from the OS RNG, URL-safe base64.
fn new_token() -> String {
    URL_SAFE_NO_PAD.encode(random_bytes::<32>())
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    fn registration(username: &str) -> RegistrationForm {
        RegistrationForm {
            username: username.into(),
            email: format!("{username}@example.com"),
            password1: "correct horse".into(),
            password2: "correct horse".into(),
        }
    }

    fn login_form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_login_identify_logout() {
        let accounts = AccountService::new(setup_test_db().await, 24);
        let user = accounts.register(&registration("sam")).await.unwrap();
        assert!(!user.is_staff);
        assert_ne!(user.password_hash, "correct horse");

        let session = accounts
            .login(&login_form("sam", "correct horse"))
            .await
            .unwrap();
        let identity = accounts.identify(&session.token).await.unwrap();
        assert!(identity.is_authenticated());
        assert!(!identity.is_staff());
        assert_eq!(identity.user.unwrap().id, user.id);

        assert!(accounts.logout(&session.token).await.unwrap());
        assert!(!accounts.identify(&session.token).await.unwrap().is_authenticated());
        assert!(!accounts.logout(&session.token).await.unwrap());
    }

    #[tokio::test]
    async fn passwords_use_pbkdf2_with_random_salts() {
        let accounts = AccountService::new(setup_test_db().await, 24);
        let first = accounts.register(&registration("sam")).await.unwrap();
        let second = accounts.register(&registration("kim")).await.unwrap();

        assert_ne!(first.salt, second.salt);
        assert_ne!(first.password_hash, second.password_hash);
        assert!(
            first
                .password_hash
                .starts_with(&format!("pbkdf2_sha256${PBKDF2_ROUNDS}$"))
        );
        assert!(verify_password(&first.salt, "correct horse", &first.password_hash));
        assert!(!verify_password(&first.salt, "correct horsE", &first.password_hash));
        assert!(!verify_password(&first.salt, "correct horse", "sha256$1$abc"));
        assert!(!verify_password(&first.salt, "correct horse", "pbkdf2_sha256$many$abc"));
    }

    #[test]
    fn tokens_are_random_and_url_safe() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(constant_time_eq(a.as_bytes(), a.as_bytes()));
        assert!(!constant_time_eq(a.as_bytes(), b.as_bytes()));
        assert!(!constant_time_eq(b"short", b"longer"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_are_rejected() {
        let accounts = AccountService::new(setup_test_db().await, 24);
        accounts.register(&registration("sam")).await.unwrap();

        assert!(matches!(
            accounts.login(&login_form("sam", "wrong horse")).await,
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            accounts.login(&login_form("nobody", "correct horse")).await,
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let accounts = AccountService::new(setup_test_db().await, 24);
        accounts.register(&registration("sam")).await.unwrap();
        assert!(matches!(
            accounts.register(&registration("sam")).await,
            Err(ServiceError::UsernameTaken(name)) if name == "sam"
        ));
        assert_eq!(accounts.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_registration_is_not_stored() {
        let accounts = AccountService::new(setup_test_db().await, 24);
        let mut form = registration("sam");
        form.password2 = "different".into();
        assert!(matches!(
            accounts.register(&form).await,
            Err(ServiceError::ValidationFailed(_))
        ));
        assert_eq!(accounts.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn promotion_grants_staff() {
        let accounts = AccountService::new(setup_test_db().await, 24);
        accounts.register(&registration("admin")).await.unwrap();
        let promoted = accounts.promote_staff("admin").await.unwrap();
        assert!(promoted.is_staff);

        let session = accounts
            .login(&login_form("admin", "correct horse"))
            .await
            .unwrap();
        let identity = accounts.identify(&session.token).await.unwrap();
        assert!(identity.require_staff().is_ok());

        assert!(matches!(
            accounts.promote_staff("ghost").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn expired_sessions_resolve_to_anonymous() {
        let db = setup_test_db().await;
        let accounts = AccountService::new(db.clone(), 24);
        accounts.register(&registration("sam")).await.unwrap();
        let session = accounts
            .login(&login_form("sam", "correct horse"))
            .await
            .unwrap();

        sqlx::query("UPDATE sessions SET expires_at = ?")
            .bind(Utc::now() - Duration::minutes(1))
            .execute(&*db)
            .await
            .unwrap();

        assert!(!accounts.identify(&session.token).await.unwrap().is_authenticated());
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&*db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn guards() {
        let anonymous = Identity::anonymous();
        assert!(matches!(
            anonymous.require_authenticated(),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(anonymous.require_staff(), Err(ServiceError::Forbidden(_))));

        let member = Identity {
            user: Some(User {
                id: Uuid::new_v4(),
                username: "sam".into(),
                email: "sam@example.com".into(),
                password_hash: String::new(),
                salt: String::new(),
                is_staff: false,
                created_at: Utc::now(),
            }),
        };
        assert!(member.require_authenticated().is_ok());
        assert!(matches!(member.require_staff(), Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn password_hash_depends_on_salt() {
        assert_eq!(hash_password("a", "pw", PBKDF2_ROUNDS), hash_password("a", "pw", PBKDF2_ROUNDS));
        assert_ne!(hash_password("a", "pw", PBKDF2_ROUNDS), hash_password("b", "pw", PBKDF2_ROUNDS));
        assert_eq!(hash_password("a", "pw", PBKDF2_ROUNDS).len(), 64);
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
