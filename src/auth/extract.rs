use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::auth::error::AuthError;

/// Local version of [`axum::Json`] for request bodies. A body that is not
/// JSON, or lacks a field, is rejected as [`AuthError::InvalidInput`] so the
/// client gets the usual `{"error": ...}` shape.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(inner) => Ok(ApiJson(inner.0)),
            Err(rejection) => {
                let message = match &rejection {
                    JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body",
                    _ => "Invalid request body",
                };
                warn!(error = %rejection.body_text(), "rejected request body");
                Err(AuthError::InvalidInput(message))
            }
        }
    }
}
