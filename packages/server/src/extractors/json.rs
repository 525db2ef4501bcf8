use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body extractor whose rejection is an [`AppError::Validation`], so a
/// malformed request body produces the same structured error envelope as any
/// other validation failure.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(payload)) => Ok(AppJson(payload)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}
