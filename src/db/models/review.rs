use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// ✅ **Review Stored in PostgreSQL**
///
/// `is_active = false` marks a soft-deleted review: the row stays in place
/// but is excluded from listings and from rating aggregation.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct Review {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub comment: String,
    pub comment_date: NaiveDateTime,
    pub grade: i32,
    pub is_active: bool,
}

/// ✅ **New Review Request (buyers only)**
#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct NewReview {
    pub product_id: i32,
    pub comment: String,
    #[validate(range(min = 1, max = 5, message = "Grade must be between 1 and 5"))]
    pub grade: i32,
}
