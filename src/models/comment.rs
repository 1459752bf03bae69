use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Columns selected for a comment. Expects `comments c` joined to `users u` on the author.
pub const COMMENT_COLUMNS: &str =
    "c.id, c.text, c.review_id AS review, c.author_id, u.username AS author, c.pub_date";

/// Represents the 'comments' table joined with the author's username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    /// Id of the review this comment belongs to.
    pub review: i64,
    #[serde(skip)]
    pub author_id: i64,
    /// Author's username.
    pub author: String,
    pub pub_date: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Comment must be between 1 and 5000 characters"
    ))]
    pub text: String,
}

/// DTO for editing a comment. An empty body leaves it unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Comment must be between 1 and 5000 characters"
    ))]
    pub text: Option<String>,
}
