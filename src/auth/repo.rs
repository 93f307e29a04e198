use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{Profile, PublicUser};

const USER_COLUMNS: &str = r#"
    id, uuid, email, password_hash, first_name, last_name,
    is_active, email_verified, login_attempts, locked_until,
    reset_token, reset_token_expires, is_premium, premium_expires_at,
    neural_profile, learning_preferences, last_login, created_at
"#;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub login_attempts: i32,
    pub locked_until: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<OffsetDateTime>,
    pub is_premium: bool,
    pub premium_expires_at: Option<OffsetDateTime>,
    pub neural_profile: serde_json::Value,
    pub learning_preferences: Option<serde_json::Value>,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Concurrent registrations with the same email race past the handler's
/// existence check; the unique index reports the loser with this code.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

/// Starting values for every new account.
pub fn default_neural_profile() -> serde_json::Value {
    serde_json::json!({
        "plasticidade": 50,
        "dopamina": 50,
        "acetilcolina": 50,
        "serotonina": 50
    })
}

impl User {
    pub fn is_locked(&self, now: OffsetDateTime) -> bool {
        matches!(self.locked_until, Some(until) if until > now)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            uuid: self.uuid,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_premium: self.is_premium,
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            uuid: self.uuid,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_premium: self.is_premium,
            neural_profile: self.neural_profile.clone(),
            learning_preferences: self.learning_preferences.clone(),
            created_at: self.created_at,
        }
    }

    /// Find a user by email. Emails are stored lowercased, callers pass the
    /// lowercased value.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password and default profile blobs.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (uuid, email, password_hash, first_name, last_name, neural_profile)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .bind(default_neural_profile())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Increment the failed-login counter and set the lockout when this
    /// failure is the threshold-th one. The CASE reads the pre-increment
    /// counter, so `login_attempts >= max - 1` locks on the 5th cumulative
    /// failure with the default max of 5. A single UPDATE keeps concurrent
    /// failures from undercounting.
    pub async fn record_login_failure(
        db: &PgPool,
        id: i64,
        max_attempts: i32,
        lock_minutes: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = login_attempts + 1,
                locked_until = CASE
                    WHEN login_attempts >= $2 THEN now() + make_interval(mins => $3)
                    ELSE locked_until
                END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(max_attempts - 1)
        .bind(lock_minutes as i32)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Reset the failure counter, clear any lockout and stamp last_login.
    pub async fn record_login_success(db: &PgPool, id: i64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = 0, locked_until = NULL, last_login = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: i64,
        token: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_token = $2, reset_token_expires = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Look up an unexpired reset token.
    pub async fn find_by_reset_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE reset_token = $1 AND reset_token_expires > now()
            "#
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Store the new hash and consume the token. Clears any lockout too,
    /// since the user has just proven control of the mailbox.
    pub async fn redeem_reset_token(
        db: &PgPool,
        id: i64,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, reset_token = NULL, reset_token_expires = NULL,
                login_attempts = 0, locked_until = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn update_profile(
        db: &PgPool,
        id: i64,
        first_name: Option<&str>,
        last_name: Option<&str>,
        learning_preferences: Option<&serde_json::Value>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                learning_preferences = COALESCE($4, learning_preferences),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(learning_preferences)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
