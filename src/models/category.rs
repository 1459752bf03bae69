// src/models/category.rs

use serde::Serialize;
use sqlx::FromRow;

use super::slug::SlugResource;

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Category {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl SlugResource for Category {
    const TABLE: &'static str = "categories";
    const NOUN: &'static str = "Category";
}
