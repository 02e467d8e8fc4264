use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::config::Config;
use crate::db::models::user::User;
use crate::utils::api_response::ApiResponse;

/// Represents a request to register a new user.
///
/// Registration always creates a `buyer`; admin accounts are provisioned
/// operationally.
#[derive(Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Desired username
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    /// User password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Represents a successful user registration response
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
}

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// The username of the authenticated user.
    pub username: String,
    /// The role assigned to the user (`buyer` or `admin`)
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    /// Converts `sub` (user ID) to `i32`, or returns a descriptive error.
    pub fn user_id(&self) -> Result<i32, ApiResponse<()>> {
        self.sub.parse::<i32>().map_err(|_| {
            ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "Invalid user ID format in token",
                None,
            )
        })
    }

    /// Buyer capability gate for review creation.
    pub fn require_buyer(&self) -> Result<(), ApiResponse<()>> {
        if self.role != "buyer" {
            return Err(ApiResponse::error(
                StatusCode::FORBIDDEN,
                "Only buyers can perform this action",
                None,
            ));
        }
        Ok(())
    }

    /// Admin capability gate for review deletion and catalog management.
    pub fn require_admin(&self) -> Result<(), ApiResponse<()>> {
        if self.role != "admin" {
            return Err(ApiResponse::error(
                StatusCode::FORBIDDEN,
                "Only admins can perform this action",
                None,
            ));
        }
        Ok(())
    }
}

/// Represents a request to log in
#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    pub password: String,
}

/// Represents a successful login response returning a JWT token.
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

/// Handles user login
///
/// # Returns
/// * `200 OK` - Returns a JWT token if authentication is successful.
/// * `401 Unauthorized` - If credentials are incorrect.
/// * `500 Internal Server Error` - If a database or token generation error occurs.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(
        content = LoginRequest,
        description = "User login details",
    ),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid username or password"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let config = Config::get();

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password_hash, role, is_active, created_at \
         FROM users WHERE username = $1 AND is_active = TRUE",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"success": false, "message": format!("Database error: {}", e)}).to_string(),
        )
    })?;

    if let Some(user) = user {
        match verify(&payload.password, &user.password_hash) {
            Ok(true) => {
                let claims = Claims {
                    sub: user.id.to_string(),
                    username: user.username.clone(),
                    role: user.role.clone(),
                    exp: chrono::Utc::now().timestamp() as usize + 36000, // 10 hour expiration
                };
                let token = encode(
                    &Header::default(),
                    &claims,
                    &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
                )
                .map_err(|e| {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"success": false, "message": format!("Token generation failed: {}", e)})
                            .to_string(),
                    )
                })?;

                info!("✅ Login successful for user: {}", payload.username);
                return Ok(Json(LoginResponse {
                    token,
                    role: user.role,
                }));
            }
            Ok(false) | Err(_) => {
                warn!("❌ Invalid password attempt for user: {}", payload.username);
                return Err((
                    StatusCode::UNAUTHORIZED,
                    json!({"success": false, "message": "Invalid username or password."}).to_string(),
                ));
            }
        }
    }

    warn!("❌ Login attempt for non-existent user: {}", payload.username);
    Err((
        StatusCode::UNAUTHORIZED,
        json!({"success": false, "message": "Invalid username or password."}).to_string(),
    ))
}

/// Handles user registration.
///
/// # Returns
/// * `200 OK` - If registration is successful.
/// * `400 Bad Request` - If username or password do not meet the length rules.
/// * `409 Conflict` - If the username is already taken.
/// * `500 Internal Server Error` - If a database error occurs.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "Authentication",
    responses(
        (status = 200, description = "Successful Register", body = RegisterResponse),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, (StatusCode, String)> {
    payload.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            json!({"success": false, "message": e.to_string()}).to_string(),
        )
    })?;

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"success": false, "message": format!("Password hashing failed: {}", e)})
                .to_string(),
        )
    })?;

    let result = sqlx::query("INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3)")
        .bind(&payload.username)
        .bind(&password_hash)
        .bind("buyer")
        .execute(&pool)
        .await;

    match result {
        Ok(_) => Ok(Json(RegisterResponse {
            message: "User registered".into(),
        })),
        Err(e) => {
            if let Some(db_err) = e.as_database_error() {
                if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                    return Err((
                        StatusCode::CONFLICT,
                        json!({"success": false, "message": "Username already taken"}).to_string(),
                    ));
                }
            }
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "message": format!("Database error: {}", e)}).to_string(),
            ))
        }
    }
}

/// Registers the public authentication routes for the API.
///
/// # Routes
/// - `POST /auth/register` → Register a new buyer account.
/// - `POST /auth/login` → Authenticate a user and return a JWT token.
pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;
use utoipa::OpenApi;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(login, register),
    components(
        schemas(
            LoginRequest, LoginResponse,
            RegisterRequest, RegisterResponse
        )
    ),
    tags(
        (name = "Authentication", description = "User Auth Endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    fn claims_with_role(role: &str) -> Claims {
        Claims {
            sub: "42".to_string(),
            username: "tester".to_string(),
            role: role.to_string(),
            exp: chrono::Utc::now().timestamp() as usize + 3600,
        }
    }

    #[test]
    fn user_id_parses_numeric_subject() {
        assert_eq!(claims_with_role("buyer").user_id().unwrap(), 42);
    }

    #[test]
    fn user_id_rejects_garbage_subject() {
        let mut claims = claims_with_role("buyer");
        claims.sub = "not-a-number".to_string();
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn buyer_capability_is_role_bound() {
        assert!(claims_with_role("buyer").require_buyer().is_ok());
        assert!(claims_with_role("admin").require_buyer().is_err());
    }

    #[test]
    fn admin_capability_is_role_bound() {
        assert!(claims_with_role("admin").require_admin().is_ok());
        assert!(claims_with_role("buyer").require_admin().is_err());
    }

    #[test]
    fn claims_round_trip_through_jwt() {
        let secret = b"unit-test-secret";
        let claims = claims_with_role("buyer");
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "42");
        assert_eq!(decoded.claims.role, "buyer");
    }

    #[test]
    fn short_passwords_fail_registration_validation() {
        let payload = RegisterRequest {
            username: "newuser".to_string(),
            password: "short".to_string(),
        };
        assert!(payload.validate().is_err());
    }
}
