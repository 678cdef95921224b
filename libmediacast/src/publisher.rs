//! Delivery of one queued post to the broadcast destination

use std::sync::Arc;

use tracing::info;

use crate::db::Database;
use crate::error::Result;
use crate::gateway::{ChatId, MessageGateway};
use crate::queue::PostQueue;
use crate::types::{MediaKind, PendingPost};

/// Result of one publish cycle.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// The queue head was delivered and durably marked published.
    Published(PendingPost),
    /// No unpublished post existed; nothing was sent.
    QueueEmpty,
}

pub struct Publisher {
    queue: PostQueue,
    db: Database,
    gateway: Arc<dyn MessageGateway>,
    destination: ChatId,
}

impl Publisher {
    pub fn new(
        queue: PostQueue,
        db: Database,
        gateway: Arc<dyn MessageGateway>,
        destination: ChatId,
    ) -> Self {
        Self {
            queue,
            db,
            gateway,
            destination,
        }
    }

    /// Deliver the oldest unpublished post, if any.
    ///
    /// At most one send per call. A delivery failure leaves the post
    /// unpublished at the head of the queue, so the next cycle retries
    /// it. If the mark-published write fails after a successful send,
    /// the error surfaces as a storage error and the post may be
    /// delivered once more on retry; it is never lost.
    pub async fn publish_next(&self) -> Result<PublishOutcome> {
        let post = match self.queue.peek_oldest_unpublished().await? {
            Some(post) => post,
            None => return Ok(PublishOutcome::QueueEmpty),
        };

        match post.kind {
            MediaKind::Photo => {
                self.gateway
                    .send_photo(&self.destination, &post.file_ref, &post.caption, None)
                    .await?
            }
            MediaKind::Video => {
                self.gateway
                    .send_video(&self.destination, &post.file_ref, &post.caption, None)
                    .await?
            }
        }

        self.db.mark_published(post.id).await?;
        info!(post_id = post.id, kind = %post.kind, "published post");

        Ok(PublishOutcome::Published(post))
    }
}
