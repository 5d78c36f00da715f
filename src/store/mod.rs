//! Post storage backed by SQLite

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::content::Post;

/// Errors returned by [`PostStore`] operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid tags encoding: {0}")]
    Tags(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A `posts` row as stored, with tags still JSON-encoded
#[derive(Debug, FromRow)]
struct PostRow {
    slug: String,
    title: String,
    date: String,
    tags: String,
    content: String,
}

impl TryFrom<PostRow> for Post {
    type Error = StoreError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Post {
            slug: row.slug,
            title: row.title,
            date: row.date,
            tags: serde_json::from_str(&row.tags)?,
            published: false,
            content: row.content,
        })
    }
}

/// Handle to the posts table. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

impl PostStore {
    /// Open (creating if missing) the database file and run migrations
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Database connected: {:?}", path);

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool. The schema is not touched.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        debug!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert a post, or replace everything but the slug when it already exists
    pub async fn upsert(&self, post: &Post) -> Result<(), StoreError> {
        let tags = serde_json::to_string(&post.tags)?;

        sqlx::query(
            r#"
            INSERT INTO posts (slug, title, date, tags, content)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(slug) DO UPDATE SET
                title = excluded.title,
                date = excluded.date,
                tags = excluded.tags,
                content = excluded.content
            "#,
        )
        .bind(&post.slug)
        .bind(&post.title)
        .bind(&post.date)
        .bind(tags)
        .bind(&post.content)
        .execute(&self.pool)
        .await?;

        info!("Saved post: {}", post.slug);
        Ok(())
    }

    /// All posts in the table's natural order
    pub async fn list(&self) -> Result<Vec<Post>, StoreError> {
        let rows: Vec<PostRow> =
            sqlx::query_as("SELECT slug, title, date, tags, content FROM posts")
                .fetch_all(&self.pool)
                .await?;

        debug!("Fetched {} posts", rows.len());
        rows.into_iter().map(Post::try_from).collect()
    }

    /// Look up a post; `Ok(None)` when no row has this slug
    pub async fn get(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let row: Option<PostRow> =
            sqlx::query_as("SELECT slug, title, date, tags, content FROM posts WHERE slug = ?1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Post::try_from).transpose()
    }

    /// Remove a post. Deleting a missing slug is not an error.
    pub async fn delete(&self, slug: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE slug = ?1")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        info!(
            "Deleted post: {} ({} rows)",
            slug,
            result.rows_affected()
        );
        Ok(())
    }
}
