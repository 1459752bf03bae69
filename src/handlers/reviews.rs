// src/handlers/reviews.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, NON_FIELD_ERRORS, map_unique_violation},
    extract::{IdPath, JsonBody, ValidatedJson},
    models::{
        query::ListParams,
        review::{CreateReviewRequest, REVIEW_COLUMNS, Review, UpdateReviewRequest},
    },
    permissions::{Caller, Policy},
    utils::html::clean_text,
};

/// Lists a title's reviews, newest first.
pub async fn list_reviews(
    State(pool): State<PgPool>,
    IdPath(title_id): IdPath<i64>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    ensure_title(&pool, title_id).await?;

    let reviews = sqlx::query_as::<_, Review>(&format!(
        r#"
        SELECT {}
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        WHERE r.title_id = $1
        ORDER BY r.pub_date DESC, r.id DESC
        LIMIT $2 OFFSET $3
        "#,
        REVIEW_COLUMNS
    ))
    .bind(title_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Json(reviews))
}

/// Retrieves one review of a title.
pub async fn get_review(
    State(pool): State<PgPool>,
    IdPath((title_id, review_id)): IdPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = find_review(&pool, title_id, review_id).await?;
    Ok(Json(review))
}

/// Creates a review authored by the caller.
/// One review per (title, author); a second attempt is a validation error.
pub async fn create_review(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    IdPath(title_id): IdPath<i64>,
    ValidatedJson(payload): ValidatedJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author = caller.require_user()?;

    let mut tx = pool.begin().await?;

    ensure_title(&mut *tx, title_id).await?;

    let already_reviewed: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
    )
    .bind(title_id)
    .bind(author.id)
    .fetch_one(&mut *tx)
    .await?;

    if already_reviewed {
        return Err(AppError::field(
            NON_FIELD_ERRORS,
            "You have already reviewed this title.",
        ));
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO reviews (title_id, author_id, text, score)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(title_id)
    .bind(author.id)
    .bind(clean_text(&payload.text))
    .bind(payload.score)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_unique_violation)?;

    let review = find_review(&mut *tx, title_id, id).await?;
    tx.commit().await?;

    tracing::info!("User {} reviewed title {} with score {}", author.username, title_id, review.score);

    Ok((StatusCode::CREATED, Json(review)))
}

/// Partially updates a review.
/// Requires: author, moderator or admin. The body is validated after that check.
pub async fn update_review(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    method: Method,
    IdPath((title_id, review_id)): IdPath<(i64, i64)>,
    JsonBody(payload): JsonBody<UpdateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let review = find_review(&pool, title_id, review_id).await?;
    Policy::AdminModeratorOrReadOnly.check_object(&caller, &method, review.author_id)?;
    payload.validate()?;

    if payload.text.is_none() && payload.score.is_none() {
        return Ok(Json(review));
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE reviews SET ");
    let mut separated = builder.separated(", ");

    if let Some(text) = payload.text {
        separated.push("text = ");
        separated.push_bind_unseparated(clean_text(&text));
    }

    if let Some(score) = payload.score {
        separated.push("score = ");
        separated.push_bind_unseparated(score);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(review.id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update review: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let review = find_review(&pool, title_id, review_id).await?;
    Ok(Json(review))
}

/// Deletes a review and its comments.
/// Requires: author, moderator or admin.
pub async fn delete_review(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    method: Method,
    IdPath((title_id, review_id)): IdPath<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = find_review(&pool, title_id, review_id).await?;
    Policy::AdminModeratorOrReadOnly.check_object(&caller, &method, review.author_id)?;

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(review.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete review: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_title<'e>(executor: impl PgExecutor<'e>, title_id: i64) -> Result<(), AppError> {
    sqlx::query("SELECT id FROM titles WHERE id = $1")
        .bind(title_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;
    Ok(())
}

/// A review that belongs to the given title, or 404.
pub(crate) async fn find_review<'e>(
    executor: impl PgExecutor<'e>,
    title_id: i64,
    review_id: i64,
) -> Result<Review, AppError> {
    sqlx::query_as::<_, Review>(&format!(
        r#"
        SELECT {}
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        WHERE r.id = $1 AND r.title_id = $2
        "#,
        REVIEW_COLUMNS
    ))
    .bind(review_id)
    .bind(title_id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Review not found".to_string()))
}
