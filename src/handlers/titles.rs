// src/handlers/titles.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, FieldErrors},
    extract::{IdPath, ValidatedJson},
    models::{
        category::Category,
        genre::{Genre, TitleGenre},
        query::{TitleFilter, like_pattern, page_limit, page_offset},
        title::{CreateTitleRequest, TITLE_COLUMNS, TitleResponse, TitleRow, UpdateTitleRequest},
    },
};

/// Lists titles, newest first.
/// Filters: category slug, genre slug, name substring, exact year.
pub async fn list_titles(
    State(pool): State<PgPool>,
    Query(filter): Query<TitleFilter>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    builder.push(TITLE_COLUMNS);
    builder.push(" FROM titles t JOIN categories c ON c.id = t.category_id WHERE TRUE");

    if let Some(category) = filter.category {
        builder.push(" AND c.slug = ");
        builder.push_bind(category);
    }

    if let Some(genre) = filter.genre {
        builder.push(
            " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = t.id AND g.slug = ",
        );
        builder.push_bind(genre);
        builder.push(")");
    }

    if let Some(pattern) = like_pattern(filter.name.as_deref()) {
        builder.push(" AND t.name ILIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\'");
    }

    if let Some(year) = filter.year {
        builder.push(" AND t.year = ");
        builder.push_bind(year);
    }

    builder.push(" ORDER BY t.id DESC LIMIT ");
    builder.push_bind(page_limit(filter.limit));
    builder.push(" OFFSET ");
    builder.push_bind(page_offset(filter.offset));

    let rows = builder
        .build_query_as::<TitleRow>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list titles: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let mut conn = pool.acquire().await?;
    let titles = with_genres(&mut conn, rows).await?;

    Ok(Json(titles))
}

/// Retrieves a single title with its current rating.
pub async fn get_title(
    State(pool): State<PgPool>,
    IdPath(id): IdPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = pool.acquire().await?;
    let title = load_title(&mut conn, id).await?;
    Ok(Json(title))
}

/// Creates a title. Category and genres are given by slug.
/// Admin only.
pub async fn create_title(
    State(pool): State<PgPool>,
    ValidatedJson(payload): ValidatedJson<CreateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    let category = resolve_category(&mut tx, &payload.category).await?;
    let genres = resolve_genres(&mut tx, &payload.genre).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO titles (name, year, description, category_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.name)
    .bind(payload.year)
    .bind(&payload.description)
    .bind(category.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create title: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    set_genres(&mut tx, id, &genres).await?;
    let title = load_title(&mut tx, id).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(title)))
}

/// Partially updates a title. A present `genre` list replaces the current one,
/// and `"description": null` clears the description.
/// Admin only.
pub async fn update_title(
    State(pool): State<PgPool>,
    IdPath(id): IdPath<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM titles WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;

    let category = match &payload.category {
        Some(slug) => Some(resolve_category(&mut tx, slug).await?),
        None => None,
    };

    if payload.name.is_some()
        || payload.year.is_some()
        || payload.description.is_some()
        || category.is_some()
    {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE titles SET ");
        let mut separated = builder.separated(", ");

        if let Some(name) = payload.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }

        if let Some(year) = payload.year {
            separated.push("year = ");
            separated.push_bind_unseparated(year);
        }

        if let Some(description) = payload.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(category) = category {
            separated.push("category_id = ");
            separated.push_bind_unseparated(category.id);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to update title: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    if let Some(slugs) = &payload.genre {
        let genres = resolve_genres(&mut tx, slugs).await?;
        sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        set_genres(&mut tx, id, &genres).await?;
    }

    let title = load_title(&mut tx, id).await?;
    tx.commit().await?;

    Ok(Json(title))
}

/// Deletes a title together with its reviews and their comments.
/// Admin only.
pub async fn delete_title(
    State(pool): State<PgPool>,
    IdPath(id): IdPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM titles WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete title: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Loads one title in its read representation.
async fn load_title(conn: &mut PgConnection, id: i64) -> Result<TitleResponse, AppError> {
    let row = sqlx::query_as::<_, TitleRow>(&format!(
        "SELECT {} FROM titles t JOIN categories c ON c.id = t.category_id WHERE t.id = $1",
        TITLE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("Title not found".to_string()))?;

    let mut titles = with_genres(conn, vec![row]).await?;
    titles
        .pop()
        .ok_or(AppError::NotFound("Title not found".to_string()))
}

/// Attaches genres to title rows with a single query, preserving row order.
async fn with_genres(conn: &mut PgConnection, rows: Vec<TitleRow>) -> Result<Vec<TitleResponse>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let links = sqlx::query_as::<_, TitleGenre>(
        r#"
        SELECT tg.title_id, g.id, g.name, g.slug
        FROM title_genres tg
        JOIN genres g ON g.id = tg.genre_id
        WHERE tg.title_id = ANY($1)
        ORDER BY g.name, g.id
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_title: HashMap<i64, Vec<Genre>> = HashMap::new();
    for link in links {
        by_title.entry(link.title_id).or_default().push(link.genre);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let genres = by_title.remove(&row.id).unwrap_or_default();
            TitleResponse::from_row(row, genres)
        })
        .collect())
}

async fn resolve_category(conn: &mut PgConnection, slug: &str) -> Result<Category, AppError> {
    sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::field("category", format!("Category with slug '{}' does not exist.", slug))
        })
}

/// Looks up every slug; any unknown slug is a field error on `genre`.
async fn resolve_genres(conn: &mut PgConnection, slugs: &[String]) -> Result<Vec<Genre>, AppError> {
    let genres = sqlx::query_as::<_, Genre>("SELECT id, name, slug FROM genres WHERE slug = ANY($1)")
        .bind(slugs)
        .fetch_all(&mut *conn)
        .await?;

    let missing: Vec<String> = slugs
        .iter()
        .filter(|slug| !genres.iter().any(|g| &g.slug == *slug))
        .map(|slug| format!("Genre with slug '{}' does not exist.", slug))
        .collect();

    if !missing.is_empty() {
        let mut fields = FieldErrors::new();
        fields.insert("genre".to_string(), missing);
        return Err(AppError::Validation(fields));
    }

    Ok(genres)
}

async fn set_genres(conn: &mut PgConnection, title_id: i64, genres: &[Genre]) -> Result<(), AppError> {
    let ids: Vec<i64> = genres.iter().map(|g| g.id).collect();
    sqlx::query(
        "INSERT INTO title_genres (title_id, genre_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
    )
    .bind(title_id)
    .bind(&ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
