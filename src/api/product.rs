use crate::db::queries::product::{create_product, get_product, get_products};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

/// Public product catalog reads.
pub fn product_routes() -> Router<PgPool> {
    Router::new()
        .route("/products", get(get_products))
        .route("/products/{product_id}", get(get_product))
}

/// Token-guarded catalog management (admin only).
pub fn secure_product_routes() -> Router<PgPool> {
    Router::new().route("/products", post(create_product))
}
