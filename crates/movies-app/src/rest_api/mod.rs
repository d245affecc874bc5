pub mod movie;

#[cfg(feature = "openapi")]
pub fn api_docs() -> utoipa::openapi::OpenApi {
    use utoipa::OpenApi as _;

    #[derive(utoipa::OpenApi)]
    #[openapi(info(title = "Movies API"))]
    struct ApiDocs;

    ApiDocs::openapi().nest("/movies", movie::api_docs())
}
