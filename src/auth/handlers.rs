use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser, RegisterRequest,
            ResetPasswordRequest, TokenResponse,
        },
        error::AuthError,
        extract::ApiJson,
        jwt::AuthUser,
        services,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = services::login(&state, &payload.email, &payload.password).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let user = services::register(&state, &payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(PublicUser {
            id: user.id,
            email: user.email,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::forgot_password(&state, &payload.email).await?;
    Ok(Json(MessageResponse {
        message: "Password reset email sent",
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    services::reset_password(&state, &payload.token, &payload.password).await?;
    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}
