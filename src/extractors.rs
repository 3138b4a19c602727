use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use tracing::warn;

use crate::error::AppError;

/// `Json<T>` whose rejection is an `InvalidArgument` in the usual error envelope.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                warn!(reason = %rejection.body_text(), "bad payload");
                Err(AppError::invalid(format!(
                    "bad payload: {}",
                    rejection.body_text()
                )))
            }
        }
    }
}
