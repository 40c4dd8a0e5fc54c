use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Failures surfaced by the auth endpoints. Every variant renders as
/// `{"error": "<message>"}`; causes are logged, never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    #[error("Failed to send reset email")]
    EmailDelivery(#[source] anyhow::Error),

    #[error("Email already registered")]
    EmailTaken,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidOrExpiredToken | AuthError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::EmailDelivery(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Internal(cause) => error!(error = %format!("{cause:#}"), "internal error"),
            AuthError::EmailDelivery(cause) => {
                error!(error = %format!("{cause:#}"), "reset email delivery failed")
            }
            _ => {}
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AuthError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_their_cause() {
        let (status, body) =
            body_of(anyhow::anyhow!("connection refused on 10.0.0.3:5432").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn taxonomy_maps_to_expected_statuses() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::InvalidOrExpiredToken, StatusCode::BAD_REQUEST),
            (
                AuthError::EmailDelivery(anyhow::anyhow!("smtp 535")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AuthError::EmailTaken, StatusCode::CONFLICT),
            (AuthError::InvalidSession, StatusCode::UNAUTHORIZED),
        ];
        for (err, expected) in cases {
            let message = err.to_string();
            let (status, body) = body_of(err).await;
            assert_eq!(status, expected);
            assert_eq!(body["error"], message.as_str());
        }
    }
}
