// src/models/review.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Columns selected for a review. Expects `reviews r` joined to `users u` on the author.
pub const REVIEW_COLUMNS: &str =
    "r.id, r.title_id, r.author_id, r.text, u.username AS author, r.score, r.pub_date";

/// Represents the 'reviews' table joined with the author's username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: i64,
    #[serde(skip)]
    pub title_id: i64,
    #[serde(skip)]
    pub author_id: i64,
    pub text: String,
    /// Author's username.
    pub author: String,
    pub score: i16,
    pub pub_date: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a review. Title and author come from the path and the caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, max = 10000, message = "Text must be between 1 and 10000 characters."))]
    pub text: String,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: i16,
}

/// DTO for updating a review. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1, max = 10000, message = "Text must be between 1 and 10000 characters."))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10."))]
    pub score: Option<i16>,
}
