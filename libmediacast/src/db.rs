//! Database operations for Mediacast

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{DbError, MediacastError, Result};
use crate::types::{MediaKind, NewPost, NewUser, PendingPost, Settings, User};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = if db_path == ":memory:" {
            // A single connection keeps every query on the same
            // in-memory database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .map_err(DbError::SqlxError)?
        } else {
            // Expand path and create parent directories
            let expanded_path = shellexpand::tilde(db_path).to_string();
            let path = Path::new(&expanded_path);

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
            }

            // Use forward slashes for SQLite URL (works on both Windows and Unix)
            // Use mode=rwc to allow creating the database file if it doesn't exist
            let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

            SqlitePool::connect(&db_url)
                .await
                .map_err(DbError::SqlxError)?
        };

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn find_user_by_chat_id(&self, chat_id: i64) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, chat_id, username, first_name, last_name, is_admin
            FROM users WHERE chat_id = ?
            "#,
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| map_user_row(&r)))
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (chat_id, username, first_name, last_name, is_admin)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.chat_id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(User {
            id: result.last_insert_rowid(),
            chat_id: user.chat_id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_admin: user.is_admin,
        })
    }

    /// Find the user for an external chat id, creating the row on first
    /// contact. The admin flag of an existing row is never touched.
    pub async fn ensure_user(&self, user: &NewUser) -> Result<User> {
        if let Some(existing) = self.find_user_by_chat_id(user.chat_id).await? {
            return Ok(existing);
        }
        self.create_user(user).await
    }

    // ------------------------------------------------------------------
    // Pending posts
    // ------------------------------------------------------------------

    pub async fn create_post(&self, post: &NewPost, created_at: i64) -> Result<PendingPost> {
        let result = sqlx::query(
            r#"
            INSERT INTO pending_posts (user_id, kind, file_ref, caption, created_at, published)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(post.user_id)
        .bind(post.kind.as_str())
        .bind(&post.file_ref)
        .bind(&post.caption)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(PendingPost {
            id: result.last_insert_rowid(),
            user_id: post.user_id,
            kind: post.kind,
            file_ref: post.file_ref.clone(),
            caption: post.caption.clone(),
            created_at,
            published: false,
        })
    }

    /// The unpublished post with the smallest (created_at, id), if any.
    pub async fn oldest_unpublished(&self) -> Result<Option<PendingPost>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, kind, file_ref, caption, created_at, published
            FROM pending_posts
            WHERE published = 0
            ORDER BY created_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| map_post_row(&r)))
    }

    pub async fn list_unpublished(&self, limit: i64) -> Result<Vec<PendingPost>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, kind, file_ref, caption, created_at, published
            FROM pending_posts
            WHERE published = 0
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(rows.iter().map(map_post_row).collect())
    }

    /// Flip the published flag. Durable once this returns Ok.
    pub async fn mark_published(&self, post_id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE pending_posts SET published = 1 WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        if result.rows_affected() == 0 {
            return Err(MediacastError::NotFound(format!(
                "post {} does not exist",
                post_id
            )));
        }
        Ok(())
    }

    /// Remove a post regardless of its published state. Returns whether
    /// a row was removed.
    pub async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a post only while it is still unpublished.
    pub async fn delete_unpublished_post(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pending_posts WHERE id = ? AND published = 0")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_posts(&self, published: bool) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pending_posts WHERE published = ?")
            .bind(published)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.get("n"))
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub async fn settings(&self) -> Result<Option<Settings>> {
        let row = sqlx::query("SELECT interval_minutes FROM settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(row.map(|r| Settings {
            interval_minutes: r.get("interval_minutes"),
        }))
    }

    /// Upsert the singleton settings row.
    pub async fn set_interval(&self, minutes: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (id, interval_minutes) VALUES (1, ?)
            ON CONFLICT (id) DO UPDATE SET interval_minutes = excluded.interval_minutes
            "#,
        )
        .bind(minutes)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }
}

fn map_user_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        is_admin: row.get::<i64, _>("is_admin") != 0,
    }
}

fn map_post_row(row: &SqliteRow) -> PendingPost {
    PendingPost {
        id: row.get("id"),
        user_id: row.get("user_id"),
        kind: MediaKind::parse(&row.get::<String, _>("kind")).unwrap_or(MediaKind::Photo),
        file_ref: row.get("file_ref"),
        caption: row.get("caption"),
        created_at: row.get("created_at"),
        published: row.get::<i64, _>("published") != 0,
    }
}
