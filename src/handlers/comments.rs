use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::IntoResponse,
};
use sqlx::{PgExecutor, PgPool};
use validator::Validate;

use crate::{
    error::AppError,
    extract::{IdPath, JsonBody, ValidatedJson},
    handlers::reviews::find_review,
    models::{
        comment::{COMMENT_COLUMNS, Comment, CommentRequest, UpdateCommentRequest},
        query::ListParams,
    },
    permissions::{Caller, Policy},
    utils::html::clean_text,
};

/// List comments on a review, newest first.
pub async fn list_comments(
    State(pool): State<PgPool>,
    IdPath((title_id, review_id)): IdPath<(i64, i64)>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    find_review(&pool, title_id, review_id).await?;

    let comments = sqlx::query_as::<_, Comment>(&format!(
        r#"
        SELECT {}
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.review_id = $1
        ORDER BY c.pub_date DESC, c.id DESC
        LIMIT $2 OFFSET $3
        "#,
        COMMENT_COLUMNS
    ))
    .bind(review_id)
    .bind(params.limit())
    .bind(params.offset())
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}

/// Get a single comment.
pub async fn get_comment(
    State(pool): State<PgPool>,
    IdPath((title_id, review_id, comment_id)): IdPath<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    find_review(&pool, title_id, review_id).await?;
    let comment = find_comment(&pool, review_id, comment_id).await?;
    Ok(Json(comment))
}

/// Create a new comment authored by the caller.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    IdPath((title_id, review_id)): IdPath<(i64, i64)>,
    ValidatedJson(payload): ValidatedJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author = caller.require_user()?;

    find_review(&pool, title_id, review_id).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (review_id, author_id, text)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(review_id)
    .bind(author.id)
    .bind(clean_text(&payload.text))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let comment = find_comment(&pool, review_id, id).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit a comment's text. An empty body returns the comment unchanged.
/// Requires: author, moderator or admin. The body is validated after that check.
pub async fn update_comment(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    method: Method,
    IdPath((title_id, review_id, comment_id)): IdPath<(i64, i64, i64)>,
    JsonBody(payload): JsonBody<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    find_review(&pool, title_id, review_id).await?;
    let comment = find_comment(&pool, review_id, comment_id).await?;
    Policy::AdminModeratorOrReadOnly.check_object(&caller, &method, comment.author_id)?;
    payload.validate()?;

    let Some(text) = payload.text else {
        return Ok(Json(comment));
    };

    sqlx::query("UPDATE comments SET text = $1 WHERE id = $2")
        .bind(clean_text(&text))
        .bind(comment.id)
        .execute(&pool)
        .await?;

    let comment = find_comment(&pool, review_id, comment_id).await?;
    Ok(Json(comment))
}

/// Delete a comment.
/// Requires: author, moderator or admin.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    Extension(caller): Extension<Caller>,
    method: Method,
    IdPath((title_id, review_id, comment_id)): IdPath<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    find_review(&pool, title_id, review_id).await?;
    let comment = find_comment(&pool, review_id, comment_id).await?;
    Policy::AdminModeratorOrReadOnly.check_object(&caller, &method, comment.author_id)?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete comment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// A comment that belongs to the given review, or 404.
async fn find_comment<'e>(
    executor: impl PgExecutor<'e>,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(&format!(
        r#"
        SELECT {}
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.id = $1 AND c.review_id = $2
        "#,
        COMMENT_COLUMNS
    ))
    .bind(comment_id)
    .bind(review_id)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))
}
