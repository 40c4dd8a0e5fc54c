use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};

/// Random bytes per reset token; hex encoding doubles the length.
pub const RESET_TOKEN_BYTES: usize = 32;

/// An opaque password reset token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl ResetToken {
    pub fn issue(now: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            token: generate_token(),
            expires_at: now + ttl,
        }
    }
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Link sent to the user; the SPA reads `token` from the query string.
pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!(
        "{}/reset-password?token={}",
        frontend_url.trim_end_matches('/'),
        token
    )
}
