use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use movies_dal::movie::validation::{validate_full, validate_partial, ValidationError};
use movies_dal::movie::{CreateMovie, MoviePatch};

use crate::state::AppState;

/// Payload that is built from a raw JSON body by checking it field by field.
pub trait ValidatedPayload: Sized {
    fn from_json(payload: serde_json::Value) -> Result<Self, ValidationError>;
}

impl ValidatedPayload for CreateMovie {
    fn from_json(payload: serde_json::Value) -> Result<Self, ValidationError> {
        validate_full(payload)
    }
}

impl ValidatedPayload for MoviePatch {
    fn from_json(payload: serde_json::Value) -> Result<Self, ValidationError> {
        validate_partial(payload)
    }
}

/// Extractor for a validated JSON body.
#[derive(Debug, Clone, Copy)]
pub struct Valid<E>(pub E);

#[derive(Debug)]
pub enum ValidationRejection<V, E> {
    /// `Valid` variant captures errors related to the validation logic.
    Valid(V),
    /// `Inner` variant represents errors of the inner JSON extractor.
    Inner(E),
}

impl<V: serde::Serialize, E: IntoResponse> IntoResponse for ValidationRejection<V, E> {
    fn into_response(self) -> Response {
        match self {
            ValidationRejection::Valid(v) => {
                (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(v)).into_response()
            }
            ValidationRejection::Inner(e) => e.into_response(),
        }
    }
}

pub type MovieRejection = ValidationRejection<ValidationError, JsonRejection>;

impl<T> FromRequest<AppState> for Valid<T>
where
    T: ValidatedPayload,
{
    type Rejection = MovieRejection;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Inner)?;

        T::from_json(payload)
            .map(Valid)
            .map_err(ValidationRejection::Valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_dispatch() {
        let patch = MoviePatch::from_json(json!({"title": "Heat"})).unwrap();
        assert_eq!(patch.title.as_deref(), Some("Heat"));

        let err = CreateMovie::from_json(json!({"title": "Heat"})).unwrap_err();
        assert!(err.has_field("genre"));
    }

    #[test]
    fn rejection_status() {
        let mut errors = ValidationError::new();
        errors.add("rate", "greater than 10");
        let rejection: MovieRejection = ValidationRejection::Valid(errors);
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
