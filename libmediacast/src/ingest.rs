//! Inbound media ingestion
//!
//! Any user, admin or not, can submit a photo or a video. Each
//! qualifying message becomes exactly one pending post owned by the
//! sender; nothing is published from this path.

use tracing::{debug, info};

use crate::config::AdminSet;
use crate::db::Database;
use crate::error::Result;
use crate::gateway::{InboundMessage, Sender};
use crate::queue::PostQueue;
use crate::types::{NewPost, NewUser, PendingPost, User};

pub struct Ingestor {
    db: Database,
    queue: PostQueue,
    admins: AdminSet,
    /// Fixed caption stamped on every submission.
    caption: String,
}

impl Ingestor {
    pub fn new(db: Database, queue: PostQueue, admins: AdminSet, caption: String) -> Self {
        Self {
            db,
            queue,
            admins,
            caption,
        }
    }

    /// Look up the sender, creating the row on first contact. The admin
    /// flag is stamped once at creation from the allow-list.
    pub async fn ensure_user(&self, from: &Sender) -> Result<User> {
        let user = self
            .db
            .ensure_user(&NewUser {
                chat_id: from.chat_id,
                username: from.username.clone(),
                first_name: from.first_name.clone(),
                last_name: from.last_name.clone(),
                is_admin: self.admins.contains(from.chat_id),
            })
            .await?;
        debug!(chat_id = from.chat_id, user_id = user.id, "resolved sender");
        Ok(user)
    }

    /// Queue one pending post for a qualifying media message. Messages
    /// without media are ignored by this pathway.
    pub async fn handle_media(&self, message: &InboundMessage) -> Result<Option<PendingPost>> {
        let media = match &message.media {
            Some(media) => media,
            None => return Ok(None),
        };

        let user = self.ensure_user(&message.from).await?;
        let post = self
            .queue
            .enqueue(NewPost {
                user_id: user.id,
                kind: media.kind,
                file_ref: media.file_ref.clone(),
                caption: self.caption.clone(),
            })
            .await?;

        info!(
            post_id = post.id,
            chat_id = message.from.chat_id,
            kind = %post.kind,
            "queued submission"
        );
        Ok(Some(post))
    }
}
