// src/models/slug.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, postgres::PgRow};
use validator::{Validate, ValidationError};

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+\z").expect("slug pattern is valid"));

/// A `name` + unique `slug` lookup table (categories, genres).
///
/// Both tables share their shape and rules, so list/create/delete handlers are
/// written once and instantiated per table.
pub trait SlugResource:
    for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static
{
    /// Database table backing the resource.
    const TABLE: &'static str;
    /// Human-readable singular noun used in error messages.
    const NOUN: &'static str;
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(ValidationError::new("invalid_slug").with_message(
            "Slug may contain only latin letters, digits, hyphens and underscores.".into(),
        ));
    }
    Ok(())
}

/// DTO for creating a category or genre.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSlugRequest {
    #[validate(length(min = 1, max = 256, message = "Name length must be between 1 and 256 characters."))]
    pub name: String,

    #[validate(
        length(min = 1, max = 50, message = "Slug length must be between 1 and 50 characters."),
        custom(function = validate_slug)
    )]
    pub slug: String,
}
