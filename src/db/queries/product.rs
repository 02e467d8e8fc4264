use axum::{
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::api::auth::Claims;
use crate::db::models::product::{NewProduct, Product, ProductIdResponse};
use crate::utils::api_response::ApiResponse;

const PRODUCT_COLUMNS: &str = "id, name, description, price, rating, is_active, created_at";

//
// REPOSITORY FUNCTIONS
//

/// A product that exists and has not been deactivated, or None.
pub async fn find_active_product(
    pool: &PgPool,
    product_id: i32,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND is_active = TRUE"
    ))
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_active_products(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = TRUE ORDER BY id"
    ))
    .fetch_all(pool)
    .await
}

/// New products start unrated; the aggregator owns every later rating write.
pub async fn insert_product(pool: &PgPool, payload: &NewProduct) -> Result<Product, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (name, description, price, rating, is_active) \
         VALUES ($1, $2, $3, 0.0, TRUE) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.price)
    .fetch_one(pool)
    .await
}

//
// API HANDLERS
//

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/products",
    tag = "Products",
    responses(
        (status = 200, description = "Active products retrieved successfully", body = Vec<Product>),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_products(
    State(db_pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Product>>, ApiResponse<()>> {
    let products = find_active_products(&db_pool)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch products", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Products retrieved successfully",
        products,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/products/{product_id}",
    tag = "Products",
    params(
        ("product_id" = i32, Path, description = "ID of the product to retrieve"),
    ),
    responses(
        (status = 200, description = "Product retrieved successfully", body = Product),
        (status = 404, description = "Product not found or inactive"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_product(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
) -> Result<ApiResponse<Product>, ApiResponse<()>> {
    let product = find_active_product(&db_pool, product_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch product", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Product not found", None)
        })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Product retrieved successfully",
        product,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    request_body = NewProduct,
    responses(
        (status = 201, description = "Product created successfully", body = ProductIdResponse),
        (status = 400, description = "Invalid product payload"),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_product(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewProduct>,
) -> Result<ApiResponse<ProductIdResponse>, ApiResponse<()>> {
    claims.require_admin()?;

    payload.validate().map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid product payload",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let product = insert_product(&db_pool, &payload)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to create product", e))?;
    tracing::info!("Product {} ({}) created", product.id, product.name);

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Product created successfully",
        ProductIdResponse { id: product.id },
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(get_products, get_product, create_product),
    components(schemas(Product, NewProduct, ProductIdResponse)),
    tags(
        (name = "Products", description = "Product Catalog Endpoints")
    )
)]
pub struct ProductDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        let payload = NewProduct {
            name: String::new(),
            description: None,
            price: 10.0,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let payload = NewProduct {
            name: "Kettle".to_string(),
            description: None,
            price: -1.0,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn well_formed_product_is_accepted() {
        let payload = NewProduct {
            name: "Kettle".to_string(),
            description: Some("Stainless steel".to_string()),
            price: 24.99,
        };
        assert!(payload.validate().is_ok());
    }
}
