use axum::middleware::from_fn;
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::api::auth::AuthDoc;
use crate::db::queries::product::ProductDoc;
use crate::db::queries::review::ReviewDoc;
use crate::middleware::auth::jwt_middleware;

/// Composes the full application router.
///
/// Listing and auth endpoints are public; every mutating route sits behind
/// the JWT middleware and does its own capability check.
pub fn build_router(pool: PgPool) -> Router {
    let merged_doc = AuthDoc::openapi()
        .merge_from(ProductDoc::openapi())
        .merge_from(ReviewDoc::openapi());

    let public_routes = Router::new()
        .merge(api::health::health_routes())
        .merge(api::auth::auth_routes())
        .merge(api::product::product_routes())
        .merge(api::review::review_routes());

    let private_routes = Router::new()
        .merge(api::product::secure_product_routes())
        .merge(api::review::secure_review_routes())
        .route_layer(from_fn(jwt_middleware));

    Router::new()
        .merge(public_routes)
        .merge(private_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/rapidoc.json", merged_doc).path("/rapidoc"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pool)
}
