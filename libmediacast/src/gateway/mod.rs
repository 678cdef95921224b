//! Messaging transport abstraction
//!
//! The bot consumes the transport as a capability: outbound delivery of
//! text and media, plus an infinite stream of inbound events. The
//! Telegram implementation lives in [`telegram`]; [`mock`] provides a
//! scripted double for tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::MediaKind;

pub mod mock;
pub mod telegram;

/// Destination for an outbound message: a numeric chat id or an
/// @channel handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatId(pub String);

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ChatId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One button of an inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

/// Inline keyboard attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// A keyboard with a single button.
    pub fn single(label: &str, data: &str) -> Self {
        Self::column(&[(label, data)])
    }

    /// One button per row.
    pub fn column(buttons: &[(&str, &str)]) -> Self {
        Self {
            rows: buttons
                .iter()
                .map(|(label, data)| {
                    vec![Button {
                        label: label.to_string(),
                        data: data.to_string(),
                    }]
                })
                .collect(),
        }
    }
}

/// Identity of the sender of an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Sender {
    pub fn bare(chat_id: i64) -> Self {
        Self {
            chat_id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }
}

/// Media payload carried by an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMedia {
    pub kind: MediaKind,
    pub file_ref: String,
}

/// An inbound event from the transport.
#[derive(Debug, Clone)]
pub enum Update {
    Message(InboundMessage),
    Callback(CallbackPress),
}

#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from: Sender,
    pub text: Option<String>,
    pub media: Option<InboundMedia>,
}

#[derive(Debug, Clone)]
pub struct CallbackPress {
    pub id: String,
    pub from: Sender,
    pub data: String,
}

/// The messaging transport, consumed as a capability.
///
/// Delivery failure surfaces as a typed [`crate::error::GatewayError`],
/// never a panic. Every send is expected to complete within a bounded
/// time.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Next inbound event. The sequence is lazy, infinite, and
    /// non-restartable.
    async fn next_update(&self) -> Result<Update>;

    async fn send_text(&self, to: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> Result<()>;

    async fn send_photo(
        &self,
        to: &ChatId,
        file_ref: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    async fn send_video(
        &self,
        to: &ChatId,
        file_ref: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()>;

    /// Acknowledge a button press so the client stops showing a spinner.
    async fn ack_callback(&self, callback_id: &str) -> Result<()>;

    /// The transport identity of this process, for the self-message guard.
    fn self_id(&self) -> i64;
}
