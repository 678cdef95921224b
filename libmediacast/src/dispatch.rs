//! Update routing
//!
//! Consumes the gateway's update stream and routes messages, the
//! /start command, and admin menu callbacks. Every error raised inside
//! one operation is caught at this boundary and translated into a
//! user-visible reply; the loop itself keeps running regardless of any
//! single update's outcome.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::admin::AdminController;
use crate::error::{MediacastError, Result};
use crate::gateway::{CallbackPress, ChatId, InboundMessage, Keyboard, MessageGateway, Update};
use crate::ingest::Ingestor;

pub struct Dispatcher {
    gateway: Arc<dyn MessageGateway>,
    ingestor: Ingestor,
    admin: AdminController,
    /// Chats whose next message is an interval answer. Replaces the
    /// per-chat conversation state of the menu flow.
    awaiting_interval: HashSet<i64>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn MessageGateway>, ingestor: Ingestor, admin: AdminController) -> Self {
        Self {
            gateway,
            ingestor,
            admin,
            awaiting_interval: HashSet::new(),
        }
    }

    /// Consume updates until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("dispatcher starting");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let gateway = self.gateway.clone();
            let update = tokio::select! {
                update = gateway.next_update() => update,
                _ = shutdown.changed() => break,
            };

            match update {
                Ok(update) => self.handle_update(update).await,
                Err(e) => {
                    error!("failed to fetch updates: {}", e);
                    // A broken transport must not spin the loop.
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
        info!("dispatcher stopped");
    }

    /// Route one update; a handler error becomes a reply to the
    /// originating chat.
    pub async fn handle_update(&mut self, update: Update) {
        let (chat_id, result) = match update {
            Update::Message(message) => {
                (message.from.chat_id, self.handle_message(&message).await)
            }
            Update::Callback(press) => (press.from.chat_id, self.handle_callback(&press).await),
        };

        if let Err(e) = result {
            warn!(chat_id, "operation failed: {}", e);
            let text = user_message(&e);
            if let Err(send_err) = self
                .gateway
                .send_text(&ChatId::from(chat_id), &text, None)
                .await
            {
                error!(chat_id, "failed to report error: {}", send_err);
            }
        }
    }

    async fn handle_message(&mut self, message: &InboundMessage) -> Result<()> {
        if message.from.chat_id == self.gateway.self_id() {
            // Never feed our own traffic back into the queue.
            return Ok(());
        }

        // One answer per interval prompt; the state clears either way.
        if self.awaiting_interval.remove(&message.from.chat_id) {
            let input = message.text.as_deref().unwrap_or("");
            return self.admin.set_interval(message.from.chat_id, input).await;
        }

        if message.media.is_some() {
            self.ingestor.handle_media(message).await?;
            return Ok(());
        }

        match message.text.as_deref() {
            Some("/start") => self.handle_start(message).await,
            other => {
                debug!(chat_id = message.from.chat_id, text = ?other, "ignoring message");
                Ok(())
            }
        }
    }

    async fn handle_start(&self, message: &InboundMessage) -> Result<()> {
        let user = self.ingestor.ensure_user(&message.from).await?;
        debug!(user_id = user.id, "handled /start");

        let to = ChatId::from(message.from.chat_id);
        if self.admin.is_admin(message.from.chat_id) {
            let keyboard = Keyboard::single("Admin menu", "admin_menu");
            self.gateway
                .send_text(
                    &to,
                    "Hello! Press the button below to open the admin menu:",
                    Some(&keyboard),
                )
                .await
        } else {
            self.gateway
                .send_text(
                    &to,
                    "Hello! Send a photo or a video and it will be queued for the channel.",
                    None,
                )
                .await
        }
    }

    async fn handle_callback(&mut self, press: &CallbackPress) -> Result<()> {
        self.gateway.ack_callback(&press.id).await?;
        let chat_id = press.from.chat_id;

        match press.data.as_str() {
            "admin_menu" => self.admin.open_menu(chat_id).await,
            "set_interval" => {
                self.admin.prompt_interval(chat_id).await?;
                self.awaiting_interval.insert(chat_id);
                Ok(())
            }
            "show_posts" => self.admin.list_pending(chat_id).await,
            data => {
                if let Some(raw_id) = data.strip_prefix("delete_") {
                    let post_id = raw_id.parse().map_err(|_| {
                        MediacastError::Validation(format!("malformed post id '{}'", raw_id))
                    })?;
                    self.admin.delete_pending(chat_id, post_id).await
                } else {
                    warn!(chat_id, data, "unknown callback ignored");
                    Ok(())
                }
            }
        }
    }
}

/// The text a user sees when an operation fails.
fn user_message(error: &MediacastError) -> String {
    match error {
        MediacastError::Authorization(_) => "You do not have access to this command.".to_string(),
        MediacastError::Validation(_) => {
            "Please send a positive number of minutes.".to_string()
        }
        MediacastError::NotFound(_) => "Post not found.".to_string(),
        other => format!("Something went wrong: {}", other),
    }
}
