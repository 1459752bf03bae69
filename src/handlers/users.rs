// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, map_unique_violation},
    extract::ValidatedJson,
    models::{
        query::ListParams,
        user::{CreateUserRequest, USER_COLUMNS, UpdateMeRequest, UpdateUserRequest, User},
    },
    permissions::{Caller, Policy},
    utils::{html::clean_text, token::generate_confirmation_code},
};

/// Lists users, newest first, optionally searching by username.
/// Admin only.
pub async fn list_users(
    State(pool): State<PgPool>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {}
        FROM users
        WHERE ($1::TEXT IS NULL OR username ILIKE $1 ESCAPE '\')
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
        USER_COLUMNS
    ))
    .bind(params.search_pattern())
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Creates a user with any role. The confirmation code is generated but not mailed.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, first_name, last_name, bio, role, confirmation_code)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(payload.first_name.unwrap_or_default())
    .bind(payload.last_name.unwrap_or_default())
    .bind(clean_text(payload.bio.as_deref().unwrap_or_default()))
    .bind(payload.role.unwrap_or_default().as_str())
    .bind(generate_confirmation_code())
    .fetch_one(&pool)
    .await
    .map_err(map_unique_violation)?;

    tracing::info!("Admin created user {} with role {}", user.username, user.role);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Retrieves a user by username.
/// Admin only.
pub async fn get_user(
    State(pool): State<PgPool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_by_username(&pool, &username).await?;
    Ok(Json(user))
}

/// Partially updates a user, role included.
/// Admin only.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(username): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = find_by_username(&pool, &username).await?;
    let user = apply_update(&pool, user, payload).await?;
    Ok(Json(user))
}

/// Deletes a user by username. Their reviews and comments go with them.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if caller.user().is_some_and(|u| u.username == username) {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(&username)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Get current user's profile.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    method: Method,
) -> Result<impl IntoResponse, AppError> {
    let me = caller.require_user()?;
    let user = find_by_id(&pool, me.id).await?;
    Policy::UserPermissions.check_object(&caller, &method, user.id)?;
    Ok(Json(user))
}

/// Edit current user's profile. The role cannot be changed here.
pub async fn update_me(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    method: Method,
    ValidatedJson(payload): ValidatedJson<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let me = caller.require_user()?;
    let user = find_by_id(&pool, me.id).await?;
    Policy::UserPermissions.check_object(&caller, &method, user.id)?;

    let user = apply_update(&pool, user, payload.into()).await?;
    Ok(Json(user))
}

async fn find_by_username(pool: &PgPool, username: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

async fn find_by_id(pool: &PgPool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Writes the present fields of `payload` and returns the updated row.
async fn apply_update(pool: &PgPool, user: User, payload: UpdateUserRequest) -> Result<User, AppError> {
    if payload.username.is_none()
        && payload.email.is_none()
        && payload.first_name.is_none()
        && payload.last_name.is_none()
        && payload.bio.is_none()
        && payload.role.is_none()
    {
        return Ok(user);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(username) = payload.username {
        separated.push("username = ");
        separated.push_bind_unseparated(username);
    }

    if let Some(email) = payload.email {
        separated.push("email = ");
        separated.push_bind_unseparated(email);
    }

    if let Some(first_name) = payload.first_name {
        separated.push("first_name = ");
        separated.push_bind_unseparated(first_name);
    }

    if let Some(last_name) = payload.last_name {
        separated.push("last_name = ");
        separated.push_bind_unseparated(last_name);
    }

    if let Some(bio) = payload.bio {
        separated.push("bio = ");
        separated.push_bind_unseparated(clean_text(&bio));
    }

    if let Some(role) = payload.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role.as_str());
    }

    builder.push(" WHERE id = ");
    builder.push_bind(user.id);
    builder.push(" RETURNING ");
    builder.push(USER_COLUMNS);

    builder
        .build_query_as::<User>()
        .fetch_optional(pool)
        .await
        .map_err(map_unique_violation)?
        .ok_or(AppError::NotFound("User not found".to_string()))
}
