// src/handlers/catalog.rs

//! Categories and genres: list, create, delete by slug.
//! Routed behind `Policy::AdminOrReadOnly`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::{AppError, foreign_key_violation, map_unique_violation},
    extract::ValidatedJson,
    models::{
        query::ListParams,
        slug::{CreateSlugRequest, SlugResource},
    },
};

/// Lists entries newest first, optionally searching by name.
pub async fn list<T: SlugResource>(
    State(pool): State<PgPool>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let items = sqlx::query_as::<_, T>(&format!(
        r#"
        SELECT id, name, slug
        FROM {}
        WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\')
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
        T::TABLE
    ))
    .bind(params.search_pattern())
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Json(items))
}

/// Creates an entry.
/// Admin only.
pub async fn create<T: SlugResource>(
    State(pool): State<PgPool>,
    ValidatedJson(payload): ValidatedJson<CreateSlugRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = sqlx::query_as::<_, T>(&format!(
        "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        T::TABLE
    ))
    .bind(&payload.name)
    .bind(&payload.slug)
    .fetch_one(&pool)
    .await
    .map_err(map_unique_violation)?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Deletes an entry by slug.
/// Admin only. Refused with 409 while titles still reference it.
pub async fn delete<T: SlugResource>(
    State(pool): State<PgPool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = $1", T::TABLE))
        .bind(&slug)
        .execute(&pool)
        .await
        .map_err(|e| {
            if foreign_key_violation(&e) {
                return AppError::Conflict(format!("{} '{}' is still used by titles", T::NOUN, slug));
            }
            tracing::error!("Failed to delete from {}: {:?}", T::TABLE, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("{} not found", T::NOUN)));
    }

    Ok(StatusCode::NO_CONTENT)
}
