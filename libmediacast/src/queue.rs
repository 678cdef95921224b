//! Ordered queue view over pending posts

use crate::db::Database;
use crate::error::{MediacastError, Result};
use crate::types::{NewPost, PendingPost};

/// FIFO view over unpublished posts, ordered by creation time with
/// insertion order breaking ties.
#[derive(Clone)]
pub struct PostQueue {
    db: Database,
}

impl PostQueue {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new unpublished post stamped with the current time.
    pub async fn enqueue(&self, post: NewPost) -> Result<PendingPost> {
        let created_at = chrono::Utc::now().timestamp();
        self.db.create_post(&post, created_at).await
    }

    /// The unpublished post with the earliest creation order, if any.
    /// Does not mutate state.
    pub async fn peek_oldest_unpublished(&self) -> Result<Option<PendingPost>> {
        self.db.oldest_unpublished().await
    }

    /// Up to `limit` unpublished posts, oldest first.
    pub async fn list_unpublished(&self, limit: i64) -> Result<Vec<PendingPost>> {
        self.db.list_unpublished(limit).await
    }

    /// Remove a post regardless of its published state.
    pub async fn delete(&self, post_id: i64) -> Result<()> {
        if self.db.delete_post(post_id).await? {
            Ok(())
        } else {
            Err(MediacastError::NotFound(format!(
                "post {} does not exist",
                post_id
            )))
        }
    }

    /// Remove a post only while it is still pending. Posts that were
    /// already published or deleted report NotFound.
    pub async fn delete_pending(&self, post_id: i64) -> Result<()> {
        if self.db.delete_unpublished_post(post_id).await? {
            Ok(())
        } else {
            Err(MediacastError::NotFound(format!(
                "post {} is not pending",
                post_id
            )))
        }
    }
}
