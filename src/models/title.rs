// src/models/title.rs

use chrono::{Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::{category::Category, genre::Genre};

/// Columns selected for the read representation, including the rating aggregate.
/// Expects `titles t` joined to `categories c`.
pub const TITLE_COLUMNS: &str = "t.id, t.name, t.year, t.description, \
     (SELECT AVG(r.score)::FLOAT8 FROM reviews r WHERE r.title_id = t.id) AS rating, \
     c.id AS category_id, c.name AS category_name, c.slug AS category_slug";

/// A title row joined to its category, with the rating computed by the query.
#[derive(Debug, Clone, FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    /// Mean review score; `None` while the title has no reviews.
    pub rating: Option<f64>,
    pub category_id: i64,
    pub category_name: String,
    pub category_slug: String,
}

/// Read representation of a title: nested category and genres plus rating.
#[derive(Debug, Clone, Serialize)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub category: Category,
    pub genre: Vec<Genre>,
}

impl TitleResponse {
    pub fn from_row(row: TitleRow, genre: Vec<Genre>) -> Self {
        Self {
            id: row.id,
            name: row.name,
            year: row.year,
            rating: row.rating,
            description: row.description,
            category: Category {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
            },
            genre,
        }
    }
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// A title cannot be dated after the current calendar year.
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    if year > current_year() {
        return Err(ValidationError::new("year_in_future")
            .with_message("Year cannot be greater than the current year.".into()));
    }
    Ok(())
}

/// DTO for creating a title. Category and genres are referenced by slug.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 256, message = "Name length must be between 1 and 256 characters."))]
    pub name: String,

    #[validate(custom(function = validate_year))]
    pub year: i32,

    pub description: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: String,

    #[validate(length(min = 1, message = "At least one genre is required."))]
    pub genre: Vec<String>,
}

/// DTO for updating a title. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 256, message = "Name length must be between 1 and 256 characters."))]
    pub name: Option<String>,

    #[validate(custom(function = validate_year))]
    pub year: Option<i32>,

    /// Absent: unchanged. `null`: cleared.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    #[validate(length(min = 1, message = "At least one genre is required."))]
    pub genre: Option<Vec<String>>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
