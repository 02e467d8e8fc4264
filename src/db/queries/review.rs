use axum::{
    extract::{Extension, Path as AxumPath, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;
use validator::Validate;

use crate::api::auth::Claims;
use crate::db::models::review::{NewReview, Review};
use crate::db::queries::product::find_active_product;
use crate::utils::api_response::ApiResponse;

const REVIEW_COLUMNS: &str = "id, user_id, product_id, comment, comment_date, grade, is_active";

//
// REPOSITORY FUNCTIONS
//

/// Active reviews, optionally scoped to one product.
pub async fn find_active_reviews(
    pool: &PgPool,
    product_id: Option<i32>,
) -> Result<Vec<Review>, sqlx::Error> {
    match product_id {
        Some(product_id) => {
            sqlx::query_as::<_, Review>(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 AND is_active = TRUE ORDER BY id"
            ))
            .bind(product_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Review>(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews WHERE is_active = TRUE ORDER BY id"
            ))
            .fetch_all(pool)
            .await
        }
    }
}

pub async fn find_active_review(
    pool: &PgPool,
    review_id: i32,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1 AND is_active = TRUE"
    ))
    .bind(review_id)
    .fetch_optional(pool)
    .await
}

/// The one-active-review-per-user-per-product pre-check. The partial unique
/// index on (user_id, product_id) WHERE is_active remains the authority under
/// concurrent inserts.
pub async fn find_active_review_by_user_and_product(
    pool: &PgPool,
    user_id: i32,
    product_id: i32,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 AND product_id = $2 AND is_active = TRUE"
    ))
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// Inserts an active review. `comment_date` is supplied by the caller so the
/// insert stays deterministic under a test clock.
pub async fn insert_review(
    pool: &PgPool,
    user_id: i32,
    payload: &NewReview,
    comment_date: chrono::NaiveDateTime,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        "INSERT INTO reviews (user_id, product_id, comment, comment_date, grade, is_active) \
         VALUES ($1, $2, $3, $4, $5, TRUE) \
         RETURNING {REVIEW_COLUMNS}"
    ))
    .bind(user_id)
    .bind(payload.product_id)
    .bind(&payload.comment)
    .bind(comment_date)
    .bind(payload.grade)
    .fetch_one(pool)
    .await
}

/// Soft-delete: flips `is_active` off, never removes the row.
pub async fn deactivate_review(pool: &PgPool, review_id: i32) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE reviews SET is_active = FALSE WHERE id = $1 AND is_active = TRUE")
        .bind(review_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

//
// RATING AGGREGATOR
//

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("product {0} not found")]
    ProductNotFound(i32),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Arithmetic mean of a set of grades; an empty set rates as 0.0.
fn mean_grade(grades: &[i32]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    grades.iter().map(|&g| f64::from(g)).sum::<f64>() / grades.len() as f64
}

/// Recomputes and persists a product's rating from its active reviews.
///
/// Must run after the triggering review mutation has been committed, so the
/// read below observes the new active set. Idempotent: re-running with no
/// intervening review change stores the same value again.
pub async fn update_product_rating(pool: &PgPool, product_id: i32) -> Result<f64, RatingError> {
    let grades = sqlx::query_scalar::<_, i32>(
        "SELECT grade FROM reviews WHERE product_id = $1 AND is_active = TRUE",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    let rating = mean_grade(&grades);

    let updated = sqlx::query("UPDATE products SET rating = $1 WHERE id = $2")
        .bind(rating)
        .bind(product_id)
        .execute(pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(RatingError::ProductNotFound(product_id));
    }

    Ok(rating)
}

//
// API HANDLERS
//

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/reviews",
    tag = "Reviews",
    responses(
        (status = 200, description = "Active reviews retrieved successfully", body = Vec<Review>),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_reviews(
    State(db_pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Review>>, ApiResponse<()>> {
    let reviews = find_active_reviews(&db_pool, None)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch reviews", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Reviews retrieved successfully",
        reviews,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/products/{product_id}/reviews",
    tag = "Reviews",
    params(
        ("product_id" = i32, Path, description = "ID of the product whose reviews are listed"),
    ),
    responses(
        (status = 200, description = "Active reviews for the product", body = Vec<Review>),
        (status = 404, description = "Product not found or inactive"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn get_product_reviews(
    State(db_pool): State<PgPool>,
    AxumPath(product_id): AxumPath<i32>,
) -> Result<ApiResponse<Vec<Review>>, ApiResponse<()>> {
    let product = find_active_product(&db_pool, product_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch product", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Product not found", None)
        })?;

    let reviews = find_active_reviews(&db_pool, Some(product.id))
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch reviews", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Reviews retrieved successfully",
        reviews,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/reviews",
    tag = "Reviews",
    request_body = NewReview,
    responses(
        (status = 200, description = "Review created successfully", body = Review),
        (status = 400, description = "Grade outside 1..=5 or malformed payload"),
        (status = 403, description = "Caller is not a buyer"),
        (status = 404, description = "Product not found or inactive"),
        (status = 409, description = "Caller already has an active review for this product"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewReview>,
) -> Result<ApiResponse<Review>, ApiResponse<()>> {
    claims.require_buyer()?;
    let user_id = claims.user_id()?;

    payload.validate().map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::BAD_REQUEST,
            "Invalid review payload",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let product = find_active_product(&db_pool, payload.product_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch product", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Product not found or inactive", None)
        })?;

    let existing = find_active_review_by_user_and_product(&db_pool, user_id, product.id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to check existing reviews", e))?;
    if existing.is_some() {
        return Err(ApiResponse::<()>::error(
            StatusCode::CONFLICT,
            "Review already exists",
            None,
        ));
    }

    let comment_date = Utc::now().naive_utc();
    let review = insert_review(&db_pool, user_id, &payload, comment_date)
        .await
        .map_err(|e| {
            // The partial unique index closes the check-then-insert race.
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                    return ApiResponse::<()>::error(
                        StatusCode::CONFLICT,
                        "Review already exists",
                        None,
                    );
                }
            }
            ApiResponse::<()>::db_error("Failed to create review", e)
        })?;

    // The insert above is committed; the aggregator reads the new active set.
    let rating = update_product_rating(&db_pool, product.id).await.map_err(|e| {
        ApiResponse::<()>::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Review created but product rating update failed",
            Some(json!({ "message": e.to_string() })),
        )
    })?;
    tracing::info!(
        "Review {} created for product {} by user {}; rating now {rating}",
        review.id,
        product.id,
        user_id
    );

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review created successfully",
        review,
    ))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/reviews/{review_id}",
    tag = "Reviews",
    params(
        ("review_id" = i32, Path, description = "ID of the review to soft-delete"),
    ),
    responses(
        (status = 200, description = "Review soft-deleted successfully"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Review not found or already inactive"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_review(
    State(db_pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(review_id): AxumPath<i32>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    claims.require_admin()?;

    let review = find_active_review(&db_pool, review_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to fetch review", e))?
        .ok_or_else(|| {
            ApiResponse::<()>::error(StatusCode::NOT_FOUND, "Review not found", None)
        })?;

    let deactivated = deactivate_review(&db_pool, review_id)
        .await
        .map_err(|e| ApiResponse::<()>::db_error("Failed to delete review", e))?;
    if deactivated == 0 {
        // Another request flipped it first.
        return Err(ApiResponse::<()>::error(
            StatusCode::NOT_FOUND,
            "Review not found",
            None,
        ));
    }

    let rating = update_product_rating(&db_pool, review.product_id)
        .await
        .map_err(|e| {
            ApiResponse::<()>::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Review deleted but product rating update failed",
                Some(json!({ "message": e.to_string() })),
            )
        })?;
    tracing::info!(
        "Review {review_id} soft-deleted; product {} rating now {rating}",
        review.product_id
    );

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Review deleted",
        (),
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(get_reviews, get_product_reviews, create_review, delete_review),
    components(schemas(Review, NewReview)),
    tags(
        (name = "Reviews", description = "Review Management Endpoints")
    )
)]
pub struct ReviewDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_grade_of_empty_set_is_zero() {
        assert_eq!(mean_grade(&[]), 0.0);
    }

    #[test]
    fn mean_grade_of_single_review() {
        assert_eq!(mean_grade(&[4]), 4.0);
    }

    #[test]
    fn mean_grade_averages_mixed_grades() {
        assert_eq!(mean_grade(&[4, 2]), 3.0);
        assert_eq!(mean_grade(&[1, 5, 3]), 3.0);
    }

    #[test]
    fn mean_grade_follows_create_and_delete_sequence() {
        // No reviews, then grade 4, then grades 4+2, then only grade 2 left.
        assert_eq!(mean_grade(&[]), 0.0);
        assert_eq!(mean_grade(&[4]), 4.0);
        assert_eq!(mean_grade(&[4, 2]), 3.0);
        assert_eq!(mean_grade(&[2]), 2.0);
    }

    #[test]
    fn mean_grade_is_not_an_integer_division() {
        assert_eq!(mean_grade(&[4, 5]), 4.5);
    }

    fn review_payload(grade: i32) -> NewReview {
        NewReview {
            product_id: 1,
            comment: "Solid product".to_string(),
            grade,
        }
    }

    #[test]
    fn grade_below_range_is_rejected() {
        assert!(review_payload(0).validate().is_err());
    }

    #[test]
    fn grade_above_range_is_rejected() {
        assert!(review_payload(6).validate().is_err());
    }

    #[test]
    fn boundary_grades_are_accepted() {
        assert!(review_payload(1).validate().is_ok());
        assert!(review_payload(5).validate().is_ok());
    }
}
