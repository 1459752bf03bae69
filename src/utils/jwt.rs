// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::user::Role,
    permissions::{Caller, CurrentUser, Policy},
    state::AppState,
};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// Role at the time the token was issued. Informational only:
    /// permission checks use the role loaded from the database.
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Signs a new access token for the user.
pub fn sign_jwt(id: i64, role: Role, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Token from an `Authorization: Bearer <token>` header.
/// Other schemes are treated as no credentials.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Axum Middleware: Authentication.
///
/// Resolves the bearer token into a `Caller` and injects it into the request
/// extensions. Requests without credentials continue as `Caller::Anonymous`;
/// an invalid token, or one whose user no longer exists, is rejected with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).map(str::to_owned);

    let caller = match token {
        None => Caller::Anonymous,
        Some(token) => {
            let claims = verify_jwt(&token, &state.config.jwt_secret)?;
            let user_id = claims
                .sub
                .parse::<i64>()
                .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

            let user = sqlx::query_as::<_, CurrentUser>(
                "SELECT id, username, role, is_staff, is_superuser FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await?
            .ok_or(AppError::AuthError("User not found".to_string()))?;

            Caller::User(user)
        }
    };

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Axum Middleware: requires an authenticated caller.
///
/// Must be used AFTER `auth_middleware`.
pub async fn require_auth_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    current_caller(&req)?.require_user()?;
    Ok(next.run(req).await)
}

/// Axum Middleware: resource-level authorization.
///
/// Must be used AFTER `auth_middleware`, as a `route_layer` with the policy of
/// the routes it guards. Runs before the body is read, so a denied caller gets
/// 401/403 whatever the payload. Object-level checks stay in the handlers.
pub async fn policy_middleware(
    State(policy): State<Policy>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    policy.check(current_caller(&req)?, req.method())?;
    Ok(next.run(req).await)
}

fn current_caller(req: &Request<Body>) -> Result<&Caller, AppError> {
    req.extensions()
        .get::<Caller>()
        .ok_or(AppError::InternalServerError("auth_middleware is not installed".to_string()))
}
