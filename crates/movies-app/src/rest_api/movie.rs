use movies_dal::movie::MovieRepository;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::routing::get;

crate::repository_from_request!(MovieRepository);

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct MovieQuery {
    /// Only movies having this genre, case insensitive
    pub genre: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Movie".to_string())
}

/// Ids that are not UUIDs cannot exist, so they are reported as not found.
fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|e| {
        tracing::debug!("Invalid movie id {id}: {e}");
        not_found()
    })
}

mod crud_api {
    use super::*;
    use crate::validate::Valid;
    use axum::{
        extract::{Path, Query, State},
        response::IntoResponse,
        Json,
    };
    #[cfg_attr(not(feature = "openapi"), allow(unused_imports))]
    use movies_dal::movie::{validation::ValidationError, CreateMovie, Movie, MoviePatch};
    use http::{header, StatusCode};
    use serde_json::json;
    use tracing::debug;

    #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "", tag = "Movie", operation_id = "listMovies",
        params(MovieQuery), responses((status = StatusCode::OK, description = "List of movies", body = Vec<Movie>))))]
    pub async fn list(
        repository: MovieRepository,
        Query(query): Query<MovieQuery>,
    ) -> ApiResult<impl IntoResponse> {
        let genre = query.genre.as_deref().filter(|g| !g.is_empty());
        debug!("Listing movies, genre filter {genre:?}");
        let movies = repository.list(genre).await?;
        Ok((StatusCode::OK, Json(movies)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(get, path = "/{id}", tag = "Movie", operation_id = "getMovie",
        params(("id" = String, Path, description = "Movie id")),
        responses((status = StatusCode::OK, description = "Get one", body = Movie),
            (status = StatusCode::NOT_FOUND, description = "No such movie"))))]
    pub async fn get(
        Path(id): Path<String>,
        repository: MovieRepository,
    ) -> ApiResult<impl IntoResponse> {
        let id = parse_id(&id)?;
        let record = repository.get(id).await?.ok_or_else(not_found)?;

        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(post, path = "", tag = "Movie", operation_id = "createMovie",
        request_body = CreateMovie,
        responses((status = StatusCode::CREATED, description = "Created movie", body = Movie),
            (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid movie", body = ValidationError))))]
    pub async fn create(
        repository: MovieRepository,
        State(state): State<AppState>,
        Valid(payload): Valid<CreateMovie>,
    ) -> ApiResult<impl IntoResponse> {
        let record = repository.create(payload).await?;
        let location = state.build_url(&format!("movies/{}", record.id))?;

        Ok((
            StatusCode::CREATED,
            [(header::LOCATION, location.to_string())],
            Json(record),
        ))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(patch, path = "/{id}", tag = "Movie", operation_id = "updateMovie",
        params(("id" = String, Path, description = "Movie id")),
        request_body = MoviePatch,
        responses((status = StatusCode::OK, description = "Updated movie", body = Movie),
            (status = StatusCode::NOT_FOUND, description = "No such movie"),
            (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid changes", body = ValidationError))))]
    pub async fn update(
        Path(id): Path<String>,
        repository: MovieRepository,
        Valid(patch): Valid<MoviePatch>,
    ) -> ApiResult<impl IntoResponse> {
        let id = parse_id(&id)?;
        let record = repository.update(id, patch).await?;

        Ok((StatusCode::OK, Json(record)))
    }

    #[cfg_attr(feature = "openapi",  utoipa::path(delete, path = "/{id}", tag = "Movie", operation_id = "deleteMovie",
        params(("id" = String, Path, description = "Movie id")),
        responses((status = StatusCode::OK, description = "Movie deleted"),
            (status = StatusCode::NOT_FOUND, description = "No such movie"))))]
    pub async fn delete(
        Path(id): Path<String>,
        repository: MovieRepository,
    ) -> ApiResult<impl IntoResponse> {
        let id = parse_id(&id)?;
        if !repository.delete(id).await? {
            return Err(not_found());
        }

        Ok((StatusCode::OK, Json(json!({"message": "Movie deleted"}))))
    }

    #[cfg(feature = "openapi")]
    #[derive(utoipa::OpenApi)]
    #[openapi(paths(list, get, create, update, delete))]
    struct ApiDocs;

    #[cfg(feature = "openapi")]
    pub(super) fn api_docs() -> utoipa::openapi::OpenApi {
        use utoipa::OpenApi as _;
        ApiDocs::openapi()
    }
}

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    crud_api::api_docs()
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(crud_api::list).post(crud_api::create))
        .route(
            "/{id}",
            get(crud_api::get)
                .patch(crud_api::update)
                .delete(crud_api::delete),
        )
}
