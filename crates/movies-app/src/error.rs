use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use movies_dal::movie::validation::ValidationError;
use serde_json::json;
use tracing::error;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Unknown genres: {}", .0.join(", "))]
    InvalidGenre(Vec<String>),

    #[error("Internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl From<movies_dal::Error> for ApiError {
    fn from(value: movies_dal::Error) -> Self {
        match value {
            movies_dal::Error::RecordNotFound(what) => ApiError::NotFound(what),
            movies_dal::Error::InvalidGenre(names) => ApiError::InvalidGenre(names),
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        ApiError::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({"message": format!("{what} not found")})),
            )
                .into_response(),
            ApiError::InvalidGenre(names) => {
                let mut errors = ValidationError::new();
                for name in names {
                    errors.add("genre", format!("Unknown genre: {name}"));
                }
                (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
            }
            ApiError::Internal(e) => {
                error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal server error"})),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found() {
        let err: ApiError = movies_dal::Error::RecordNotFound("Movie".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body, json!({"message": "Movie not found"}));
    }

    #[tokio::test]
    async fn test_invalid_genre() {
        let err: ApiError =
            movies_dal::Error::InvalidGenre(vec!["Western".to_string(), "Noir".to_string()]).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({"errors": {"genre": ["Unknown genre: Western", "Unknown genre: Noir"]}})
        );
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let err: ApiError = movies_dal::Error::DatabaseError(sqlx_error()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body, json!({"error": "Internal server error"}));
    }

    fn sqlx_error() -> movies_dal::SqlxError {
        movies_dal::SqlxError::PoolTimedOut
    }
}
