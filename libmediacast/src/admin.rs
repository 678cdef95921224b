//! Interactive administration operations
//!
//! Every operation authorizes the caller against the static allow-list
//! before doing anything. Admin commands never touch delivery timing
//! directly; a forced publish goes through the scheduler worker.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AdminSet;
use crate::db::Database;
use crate::error::{MediacastError, Result};
use crate::gateway::{ChatId, Keyboard, MessageGateway};
use crate::publisher::PublishOutcome;
use crate::queue::PostQueue;
use crate::scheduler::SchedulerHandle;
use crate::types::MediaKind;

/// Most pending posts shown by a single review request.
const REVIEW_LIMIT: i64 = 40;

pub struct AdminController {
    db: Database,
    queue: PostQueue,
    gateway: Arc<dyn MessageGateway>,
    scheduler: SchedulerHandle,
    admins: AdminSet,
}

impl AdminController {
    pub fn new(
        db: Database,
        queue: PostQueue,
        gateway: Arc<dyn MessageGateway>,
        scheduler: SchedulerHandle,
        admins: AdminSet,
    ) -> Self {
        Self {
            db,
            queue,
            gateway,
            scheduler,
            admins,
        }
    }

    /// Admin status is derived from the allow-list on every call, never
    /// from a cached per-user flag.
    pub fn is_admin(&self, chat_id: i64) -> bool {
        self.admins.contains(chat_id)
    }

    fn require_admin(&self, chat_id: i64) -> Result<()> {
        if self.is_admin(chat_id) {
            Ok(())
        } else {
            Err(MediacastError::Authorization(format!(
                "chat {} is not an administrator",
                chat_id
            )))
        }
    }

    /// Present the available admin actions. No state mutation.
    pub async fn open_menu(&self, chat_id: i64) -> Result<()> {
        self.require_admin(chat_id)?;
        let keyboard = Keyboard::column(&[
            ("Manage interval", "set_interval"),
            ("Manage posts", "show_posts"),
        ]);
        self.gateway
            .send_text(&ChatId::from(chat_id), "Admin menu:", Some(&keyboard))
            .await
    }

    /// Ask for a new interval value. The dispatcher remembers that the
    /// next message from this chat carries the answer.
    pub async fn prompt_interval(&self, chat_id: i64) -> Result<()> {
        self.require_admin(chat_id)?;
        self.gateway
            .send_text(
                &ChatId::from(chat_id),
                "Send the desired interval between posts, in minutes. For example: 5",
                None,
            )
            .await
    }

    /// Validate and persist a new interval, then publish the next post
    /// right away. The scheduler picks the new interval up on its next
    /// arming decision.
    pub async fn set_interval(&self, chat_id: i64, input: &str) -> Result<()> {
        self.require_admin(chat_id)?;
        let minutes = parse_interval(input)?;

        self.db.set_interval(minutes).await?;
        info!(minutes, "broadcast interval updated");
        self.gateway
            .send_text(&ChatId::from(chat_id), "Interval set.", None)
            .await?;

        // Convenience publish on every interval change. Its failure is
        // logged, not reported back; the post stays queued for retry.
        match self.scheduler.publish_now().await {
            Ok(PublishOutcome::Published(post)) => {
                info!(post_id = post.id, "published on interval change")
            }
            Ok(PublishOutcome::QueueEmpty) => {}
            Err(e) => warn!("publish on interval change failed: {}", e),
        }
        Ok(())
    }

    /// Send up to forty oldest pending posts back to the admin, each
    /// with a delete button.
    pub async fn list_pending(&self, chat_id: i64) -> Result<()> {
        self.require_admin(chat_id)?;
        let posts = self.queue.list_unpublished(REVIEW_LIMIT).await?;
        let to = ChatId::from(chat_id);

        if posts.is_empty() {
            return self.gateway.send_text(&to, "No pending posts.", None).await;
        }

        for post in posts {
            let keyboard = Keyboard::single("Delete", &format!("delete_{}", post.id));
            match post.kind {
                MediaKind::Photo => {
                    self.gateway
                        .send_photo(&to, &post.file_ref, &post.caption, Some(&keyboard))
                        .await?
                }
                MediaKind::Video => {
                    self.gateway
                        .send_video(&to, &post.file_ref, &post.caption, Some(&keyboard))
                        .await?
                }
            }
        }
        Ok(())
    }

    /// Delete one pending post. Posts that are gone or already
    /// published report NotFound.
    pub async fn delete_pending(&self, chat_id: i64, post_id: i64) -> Result<()> {
        self.require_admin(chat_id)?;
        self.queue.delete_pending(post_id).await?;
        info!(post_id, "pending post deleted");
        self.gateway
            .send_text(&ChatId::from(chat_id), "Post deleted.", None)
            .await
    }
}

/// Parse and validate an interval: a positive integer of minutes.
pub fn parse_interval(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    let minutes: i64 = trimmed
        .parse()
        .map_err(|_| MediacastError::Validation(format!("'{}' is not a number", trimmed)))?;
    if minutes <= 0 {
        return Err(MediacastError::Validation(
            "interval must be a positive number of minutes".to_string(),
        ));
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{MockGateway, SentPayload};
    use crate::publisher::Publisher;
    use crate::scheduler::Scheduler;
    use crate::types::{NewPost, NewUser};
    use tokio::sync::watch;

    const ADMIN: i64 = 100;
    const OUTSIDER: i64 = 200;

    struct Harness {
        admin: AdminController,
        db: Database,
        queue: PostQueue,
        gateway: MockGateway,
        _shutdown: watch::Sender<bool>,
        user_id: i64,
    }

    async fn setup() -> Harness {
        let db = Database::new(":memory:").await.unwrap();
        let user = db
            .create_user(&NewUser {
                chat_id: OUTSIDER,
                username: None,
                first_name: None,
                last_name: None,
                is_admin: false,
            })
            .await
            .unwrap();

        let queue = PostQueue::new(db.clone());
        let gateway = MockGateway::new();
        let publisher = Publisher::new(
            queue.clone(),
            db.clone(),
            Arc::new(gateway.clone()),
            ChatId::from("@channel"),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (scheduler, handle) = Scheduler::new(db.clone(), publisher, shutdown_rx);
        tokio::spawn(scheduler.run());

        let admin = AdminController::new(
            db.clone(),
            queue.clone(),
            Arc::new(gateway.clone()),
            handle,
            AdminSet::new([ADMIN]),
        );

        Harness {
            admin,
            db,
            queue,
            gateway,
            _shutdown: shutdown_tx,
            user_id: user.id,
        }
    }

    fn photo(user_id: i64, file_ref: &str) -> NewPost {
        NewPost {
            user_id,
            kind: MediaKind::Photo,
            file_ref: file_ref.to_string(),
            caption: String::new(),
        }
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("5").unwrap(), 5);
        assert_eq!(parse_interval(" 15 ").unwrap(), 15);

        assert!(matches!(
            parse_interval("abc"),
            Err(MediacastError::Validation(_))
        ));
        assert!(matches!(
            parse_interval("0"),
            Err(MediacastError::Validation(_))
        ));
        assert!(matches!(
            parse_interval("-3"),
            Err(MediacastError::Validation(_))
        ));
        assert!(matches!(
            parse_interval("2.5"),
            Err(MediacastError::Validation(_))
        ));
        assert!(matches!(
            parse_interval(""),
            Err(MediacastError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_non_admin_operations_are_rejected() {
        let harness = setup().await;

        let menu = harness.admin.open_menu(OUTSIDER).await;
        assert!(matches!(menu, Err(MediacastError::Authorization(_))));

        let interval = harness.admin.set_interval(OUTSIDER, "5").await;
        assert!(matches!(interval, Err(MediacastError::Authorization(_))));

        let listing = harness.admin.list_pending(OUTSIDER).await;
        assert!(matches!(listing, Err(MediacastError::Authorization(_))));

        let deletion = harness.admin.delete_pending(OUTSIDER, 1).await;
        assert!(matches!(deletion, Err(MediacastError::Authorization(_))));

        // No side effects: nothing sent, nothing persisted.
        assert_eq!(harness.gateway.send_count(), 0);
        assert!(harness.db.settings().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_menu_sends_keyboard() {
        let harness = setup().await;
        harness.admin.open_menu(ADMIN).await.unwrap();

        let sent = harness.gateway.sent_to(&ChatId::from(ADMIN));
        assert_eq!(sent.len(), 1);
        let keyboard = sent[0].keyboard.as_ref().unwrap();
        let data: Vec<&str> = keyboard
            .rows
            .iter()
            .map(|row| row[0].data.as_str())
            .collect();
        assert_eq!(data, vec!["set_interval", "show_posts"]);
    }

    #[tokio::test]
    async fn test_set_interval_persists_and_publishes_immediately() {
        let harness = setup().await;
        harness
            .queue
            .enqueue(photo(harness.user_id, "head"))
            .await
            .unwrap();

        harness.admin.set_interval(ADMIN, "5").await.unwrap();

        assert_eq!(
            harness.db.settings().await.unwrap().unwrap().interval_minutes,
            5
        );

        // Confirmation to the admin plus the convenience publish.
        let to_admin = harness.gateway.sent_to(&ChatId::from(ADMIN));
        assert_eq!(to_admin.len(), 1);
        let to_channel = harness.gateway.sent_to(&ChatId::from("@channel"));
        assert_eq!(to_channel.len(), 1);
        assert!(harness
            .queue
            .peek_oldest_unpublished()
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_set_interval_invalid_input_changes_nothing() {
        let harness = setup().await;
        harness.db.set_interval(7).await.unwrap();

        for input in ["abc", "0", "-2", "1.5"] {
            let result = harness.admin.set_interval(ADMIN, input).await;
            assert!(matches!(result, Err(MediacastError::Validation(_))));
        }

        // Settings untouched, nothing delivered.
        assert_eq!(
            harness.db.settings().await.unwrap().unwrap().interval_minutes,
            7
        );
        assert_eq!(harness.gateway.sent_to(&ChatId::from("@channel")).len(), 0);
    }

    #[tokio::test]
    async fn test_set_interval_with_empty_queue() {
        let harness = setup().await;

        harness.admin.set_interval(ADMIN, "3").await.unwrap();

        assert_eq!(
            harness.db.settings().await.unwrap().unwrap().interval_minutes,
            3
        );
        assert_eq!(harness.gateway.sent_to(&ChatId::from("@channel")).len(), 0);
    }

    #[tokio::test]
    async fn test_list_pending_sends_posts_with_delete_buttons() {
        let harness = setup().await;
        let p1 = harness
            .queue
            .enqueue(photo(harness.user_id, "a"))
            .await
            .unwrap();
        let p2 = harness
            .queue
            .enqueue(photo(harness.user_id, "b"))
            .await
            .unwrap();

        harness.admin.list_pending(ADMIN).await.unwrap();

        let sent = harness.gateway.sent_to(&ChatId::from(ADMIN));
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0].keyboard.as_ref().unwrap().rows[0][0].data,
            format!("delete_{}", p1.id)
        );
        assert_eq!(
            sent[1].keyboard.as_ref().unwrap().rows[0][0].data,
            format!("delete_{}", p2.id)
        );
    }

    #[tokio::test]
    async fn test_list_pending_empty_queue() {
        let harness = setup().await;
        harness.admin.list_pending(ADMIN).await.unwrap();

        let sent = harness.gateway.sent_to(&ChatId::from(ADMIN));
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].payload,
            SentPayload::Text {
                text: "No pending posts.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_pending_caps_at_forty() {
        let harness = setup().await;
        for i in 0..45 {
            harness
                .queue
                .enqueue(photo(harness.user_id, &format!("p{}", i)))
                .await
                .unwrap();
        }

        harness.admin.list_pending(ADMIN).await.unwrap();

        assert_eq!(harness.gateway.sent_to(&ChatId::from(ADMIN)).len(), 40);
    }

    #[tokio::test]
    async fn test_delete_pending() {
        let harness = setup().await;
        let post = harness
            .queue
            .enqueue(photo(harness.user_id, "a"))
            .await
            .unwrap();

        harness.admin.delete_pending(ADMIN, post.id).await.unwrap();
        assert!(harness
            .queue
            .peek_oldest_unpublished()
            .await
            .unwrap()
            .is_none());

        // Deleting again reports NotFound.
        let again = harness.admin.delete_pending(ADMIN, post.id).await;
        assert!(matches!(again, Err(MediacastError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_pending_rejects_published_post() {
        let harness = setup().await;
        let post = harness
            .queue
            .enqueue(photo(harness.user_id, "a"))
            .await
            .unwrap();
        harness.db.mark_published(post.id).await.unwrap();

        let result = harness.admin.delete_pending(ADMIN, post.id).await;
        assert!(matches!(result, Err(MediacastError::NotFound(_))));
    }
}
