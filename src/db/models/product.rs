use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    /// Derived mean of active review grades; 0.0 when no active reviews exist.
    pub rating: f64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// ✅ **New Product Request (admins only)**
#[derive(Deserialize, Debug, Validate, ToSchema)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ProductIdResponse {
    pub id: i32,
}
