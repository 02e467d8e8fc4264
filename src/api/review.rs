use crate::db::queries::review::{create_review, delete_review, get_product_reviews, get_reviews};
use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;

/// Public, unauthenticated review listings.
pub fn review_routes() -> Router<PgPool> {
    Router::new()
        .route("/reviews", get(get_reviews))
        .route("/products/{product_id}/reviews", get(get_product_reviews))
}

/// Token-guarded review mutations (buyer create, admin soft-delete).
pub fn secure_review_routes() -> Router<PgPool> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/{review_id}", delete(delete_review))
}
