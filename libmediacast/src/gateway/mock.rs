//! Mock gateway implementation for testing
//!
//! Plays back a scripted sequence of inbound updates and records every
//! outbound send. Delivery failures can be injected to exercise the
//! retry path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{GatewayError, Result};

use super::{ChatId, Keyboard, MessageGateway, Update};

/// One outbound message captured by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub to: ChatId,
    pub payload: SentPayload,
    pub keyboard: Option<Keyboard>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SentPayload {
    Text { text: String },
    Photo { file_ref: String, caption: String },
    Video { file_ref: String, caption: String },
}

#[derive(Clone)]
pub struct MockGateway {
    bot_id: i64,
    updates: Arc<Mutex<VecDeque<Update>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    acked: Arc<Mutex<Vec<String>>>,
    /// Number of upcoming sends that fail before delivery recovers.
    failing_sends: Arc<Mutex<usize>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            bot_id: 999,
            updates: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            acked: Arc::new(Mutex::new(Vec::new())),
            failing_sends: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_updates(updates: Vec<Update>) -> Self {
        let gateway = Self::new();
        gateway.updates.lock().unwrap().extend(updates);
        gateway
    }

    /// Append an inbound update to the script.
    pub fn push_update(&self, update: Update) {
        self.updates.lock().unwrap().push_back(update);
    }

    /// Make the next `count` sends fail with a delivery error.
    pub fn fail_next_sends(&self, count: usize) {
        *self.failing_sends.lock().unwrap() = count;
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Everything sent to one destination.
    pub fn sent_to(&self, to: &ChatId) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.to == to)
            .cloned()
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    fn record(&self, message: SentMessage) -> Result<()> {
        {
            let mut failing = self.failing_sends.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(GatewayError::Delivery("injected delivery failure".to_string()).into());
            }
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageGateway for MockGateway {
    async fn next_update(&self) -> Result<Update> {
        if let Some(update) = self.updates.lock().unwrap().pop_front() {
            return Ok(update);
        }
        // An exhausted script behaves like a quiet transport: the call
        // never resolves rather than ending the stream.
        std::future::pending().await
    }

    async fn send_text(&self, to: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> Result<()> {
        self.record(SentMessage {
            to: to.clone(),
            payload: SentPayload::Text {
                text: text.to_string(),
            },
            keyboard: keyboard.cloned(),
        })
    }

    async fn send_photo(
        &self,
        to: &ChatId,
        file_ref: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        self.record(SentMessage {
            to: to.clone(),
            payload: SentPayload::Photo {
                file_ref: file_ref.to_string(),
                caption: caption.to_string(),
            },
            keyboard: keyboard.cloned(),
        })
    }

    async fn send_video(
        &self,
        to: &ChatId,
        file_ref: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        self.record(SentMessage {
            to: to.clone(),
            payload: SentPayload::Video {
                file_ref: file_ref.to_string(),
                caption: caption.to_string(),
            },
            keyboard: keyboard.cloned(),
        })
    }

    async fn ack_callback(&self, callback_id: &str) -> Result<()> {
        self.acked.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }

    fn self_id(&self) -> i64 {
        self.bot_id
    }
}
