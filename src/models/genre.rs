// src/models/genre.rs

use serde::Serialize;
use sqlx::FromRow;

use super::slug::SlugResource;

/// Represents the 'genres' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Genre {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl SlugResource for Genre {
    const TABLE: &'static str = "genres";
    const NOUN: &'static str = "Genre";
}

/// A genre joined to the title it is attached to.
#[derive(Debug, FromRow)]
pub struct TitleGenre {
    pub title_id: i64,
    #[sqlx(flatten)]
    pub genre: Genre,
}
