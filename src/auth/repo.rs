use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Persistence for user records and their outstanding reset tokens.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Find the user holding `token`, only if it expires strictly after `now`.
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>>;

    /// Insert a new user. Returns `None` when the email is already registered.
    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<Option<User>>;

    /// Store a reset token, replacing any previous one.
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Clear the reset token, but only if `token` is still the stored one.
    async fn revoke_reset_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<bool>;

    /// Replace the password hash and consume `token` in one update.
    /// Returns `false` if the token was no longer stored.
    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, reset_token, reset_token_expires_at, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token = $1 AND reset_token_expires_at > $2"
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("find user by reset token")?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token = $1, reset_token_expires_at = $2
             WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("store reset token")?;
        Ok(())
    }

    async fn revoke_reset_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET reset_token = NULL, reset_token_expires_at = NULL
             WHERE id = $1 AND reset_token = $2
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.db)
        .await
        .context("revoke reset token")?;
        Ok(res.rows_affected() == 1)
    }

    async fn complete_password_reset(
        &self,
        user_id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $1, reset_token = NULL, reset_token_expires_at = NULL
             WHERE id = $2 AND reset_token = $3
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .bind(token)
        .execute(&self.db)
        .await
        .context("update password")?;
        Ok(res.rows_affected() == 1)
    }
}
