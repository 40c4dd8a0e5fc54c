use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};

use crate::{
    auth::{
        error::AuthError,
        jwt::JwtKeys,
        password::{hash_password_async, verify_password_async},
        repo_types::User,
        reset_token::{reset_link, ResetToken},
    },
    config::MAX_TTL_MINUTES,
    mail::password_reset_email,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Checks the credentials and issues a session token for the user.
///
/// Unknown email and wrong password both yield
/// [`AuthError::InvalidCredentials`].
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<String, AuthError> {
    let Some(user) = state.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password_async(password.to_string(), user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(state).sign_session(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

/// Issues a fresh reset token for `email` and mails the reset link.
///
/// The token is stored before the mail goes out. If delivery fails the token
/// is revoked again so no unannounced token stays usable.
pub async fn forgot_password(state: &AppState, email: &str) -> Result<ResetToken, AuthError> {
    let Some(user) = state.users.find_by_email(email).await? else {
        warn!(email = %email, "reset requested for unknown email");
        return Err(AuthError::UserNotFound);
    };

    let ttl_minutes = state
        .config
        .reset_token_ttl_minutes
        .clamp(1, MAX_TTL_MINUTES);
    let reset = ResetToken::issue(OffsetDateTime::now_utc(), Duration::minutes(ttl_minutes));
    state
        .users
        .set_reset_token(user.id, &reset.token, reset.expires_at)
        .await?;

    let link = reset_link(&state.config.frontend_url, &reset.token);
    let mail = password_reset_email(&user.email, &link, ttl_minutes);
    if let Err(e) = state.mailer.send(mail).await {
        match state.users.revoke_reset_token(user.id, &reset.token).await {
            Ok(_) => warn!(user_id = %user.id, "reset token revoked after failed delivery"),
            Err(revoke_err) => {
                error!(user_id = %user.id, error = %revoke_err, "could not revoke reset token")
            }
        }
        return Err(AuthError::EmailDelivery(e));
    }

    info!(user_id = %user.id, expires_at = %reset.expires_at, "reset email sent");
    Ok(reset)
}

/// Consumes a valid reset token and replaces the user's password.
pub async fn reset_password(state: &AppState, token: &str, password: &str) -> Result<(), AuthError> {
    let now = OffsetDateTime::now_utc();
    let found = state.users.find_by_reset_token(token, now).await?;
    let Some(user) = found.filter(|u| u.reset_token_matches(token, now)) else {
        warn!("reset attempted with unknown or expired token");
        return Err(AuthError::InvalidOrExpiredToken);
    };

    let hash = hash_password_async(password.to_string()).await?;
    if !state
        .users
        .complete_password_reset(user.id, token, &hash)
        .await?
    {
        warn!(user_id = %user.id, "reset token consumed concurrently");
        return Err(AuthError::InvalidOrExpiredToken);
    }

    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Creates a user. The email is stored exactly as given.
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<User, AuthError> {
    if !is_valid_email(email) {
        return Err(AuthError::InvalidInput("Invalid email"));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidInput("Password is required"));
    }

    let hash = hash_password_async(password.to_string()).await?;
    let Some(user) = state.users.create(email, &hash).await? else {
        warn!(email = %email, "email already registered");
        return Err(AuthError::EmailTaken);
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Loads the user a verified session token points at.
pub async fn current_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, AuthError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::InvalidSession)
}
