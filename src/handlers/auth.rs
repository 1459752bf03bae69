// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::{AppError, FieldErrors, map_unique_violation},
    extract::ValidatedJson,
    models::user::{SignupRequest, SignupResponse, TokenRequest, USER_COLUMNS, User},
    utils::{
        jwt::sign_jwt,
        mail::{Email, Mailer},
        token::generate_confirmation_code,
    },
};

/// Registers a user, or re-sends the code to an already registered pair.
///
/// An existing (username, email) pair keeps its confirmation code. A username or
/// email that belongs to a different account is a field error. The code is mailed
/// after the transaction commits; a delivery failure is logged and the user stays.
pub async fn signup(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(mailer): State<Arc<dyn Mailer>>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1 OR email = $2 FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(&payload.username)
    .bind(&payload.email)
    .fetch_all(&mut *tx)
    .await?;

    let user = match existing
        .iter()
        .find(|u| u.username == payload.username && u.email == payload.email)
    {
        Some(user) => {
            tracing::info!("Re-sending confirmation code to {}", user.username);
            user.clone()
        }
        None => {
            let mut fields = FieldErrors::new();
            for user in &existing {
                if user.username == payload.username {
                    fields
                        .entry("username".to_string())
                        .or_default()
                        .push("A user with that username already exists.".to_string());
                }
                if user.email == payload.email {
                    fields
                        .entry("email".to_string())
                        .or_default()
                        .push("A user with that email already exists.".to_string());
                }
            }
            if !fields.is_empty() {
                return Err(AppError::Validation(fields));
            }

            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (username, email, confirmation_code) \
                 VALUES ($1, $2, $3) RETURNING {}",
                USER_COLUMNS
            ))
            .bind(&payload.username)
            .bind(&payload.email)
            .bind(generate_confirmation_code())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_unique_violation)?
        }
    };

    tx.commit().await?;

    let email = Email::confirmation(&config.email_address, &user.email, &user.confirmation_code);
    if let Err(e) = mailer.send(&email).await {
        tracing::error!("Failed to send confirmation code to {}: {:?}", user.email, e);
    }

    Ok(Json(SignupResponse {
        username: user.username,
        email: user.email,
    }))
}

/// Exchanges a confirmation code for an access token.
///
/// Unknown usernames are 404. A wrong code is a 400 whose message does not say
/// which of the two fields was wrong.
pub async fn obtain_token(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    ValidatedJson(payload): ValidatedJson<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE username = $1",
        USER_COLUMNS
    ))
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Token DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    if payload.confirmation_code != user.confirmation_code {
        return Err(AppError::BadRequest(
            "Invalid username or confirmation code".to_string(),
        ));
    }

    let token = sign_jwt(user.id, user.role, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}
