use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                     // unique user ID
    pub email: String,                // stored exactly as registered
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,  // outstanding reset token, if any
    #[serde(skip_serializing)]
    pub reset_token_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,   // creation timestamp
}

impl User {
    /// True when a reset token is stored and `token` matches it before expiry.
    pub fn reset_token_matches(&self, token: &str, now: OffsetDateTime) -> bool {
        match (&self.reset_token, self.reset_token_expires_at) {
            (Some(stored), Some(expires_at)) => stored == token && expires_at > now,
            _ => false,
        }
    }
}
