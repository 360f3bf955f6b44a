//! services/api/src/web/extract.rs
//!
//! Request-body extraction with the validation policy applied uniformly:
//! a body that is missing, malformed, or carries a wrongly-typed field is a
//! plain 400 validation failure, indistinguishable from a missing field.

use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Message used by every presence/type validation failure.
pub const ALL_FIELDS_REQUIRED: &str = "All fields are required";

/// `Json<T>` with rejections mapped to the validation error. Handlers model
/// required fields as `Option`s and check presence themselves, so the only
/// work left here is type errors and unparseable bodies.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(_) => Err(ApiError::Validation(ALL_FIELDS_REQUIRED.to_string())),
        }
    }
}
