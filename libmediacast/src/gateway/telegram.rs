//! Telegram Bot API gateway
//!
//! Long-polls `getUpdates` for inbound events and delivers outbound
//! messages over the HTTP Bot API. Requests carry a client-side timeout
//! so a stalled transport cannot hang a publish cycle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GatewayError, MediacastError, Result};
use crate::types::MediaKind;

use super::{
    CallbackPress, ChatId, InboundMedia, InboundMessage, Keyboard, MessageGateway, Sender, Update,
};

/// Seconds the server holds a getUpdates call open.
const POLL_TIMEOUT_SECS: u64 = 25;
/// Client-side ceiling per request; must exceed the long-poll hold.
const REQUEST_TIMEOUT_SECS: u64 = 35;

pub struct TelegramGateway {
    client: Client,
    base_url: String,
    bot_id: i64,
    offset: AtomicI64,
    buffer: Mutex<VecDeque<Update>>,
}

impl TelegramGateway {
    /// Connect to the Bot API and resolve the bot's own identity.
    pub async fn connect(token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let base_url = format!("https://api.telegram.org/bot{}", token);

        let me: TgUser = call(&client, &format!("{}/getMe", base_url), &EmptyPayload {}).await?;
        debug!(bot_id = me.id, "connected to Bot API");

        Ok(Self {
            client,
            base_url,
            bot_id: me.id,
            offset: AtomicI64::new(0),
            buffer: Mutex::new(VecDeque::new()),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn next_update(&self) -> Result<Update> {
        loop {
            if let Some(update) = self.buffer.lock().unwrap().pop_front() {
                return Ok(update);
            }

            let payload = GetUpdates {
                offset: self.offset.load(Ordering::SeqCst),
                timeout: POLL_TIMEOUT_SECS,
            };
            let raw_updates: Vec<TgUpdate> =
                call(&self.client, &self.url("getUpdates"), &payload).await?;

            let mut buffer = self.buffer.lock().unwrap();
            for raw in raw_updates {
                self.offset.store(raw.update_id + 1, Ordering::SeqCst);
                if let Some(update) = convert_update(raw) {
                    buffer.push_back(update);
                }
            }
        }
    }

    async fn send_text(&self, to: &ChatId, text: &str, keyboard: Option<&Keyboard>) -> Result<()> {
        let payload = SendMessage {
            chat_id: &to.0,
            text,
            reply_markup: markup_of(keyboard),
        };
        let _: serde_json::Value = call(&self.client, &self.url("sendMessage"), &payload).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        to: &ChatId,
        file_ref: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let payload = SendPhoto {
            chat_id: &to.0,
            photo: file_ref,
            caption,
            parse_mode: "Markdown",
            reply_markup: markup_of(keyboard),
        };
        let _: serde_json::Value = call(&self.client, &self.url("sendPhoto"), &payload).await?;
        Ok(())
    }

    async fn send_video(
        &self,
        to: &ChatId,
        file_ref: &str,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let payload = SendVideo {
            chat_id: &to.0,
            video: file_ref,
            caption,
            parse_mode: "Markdown",
            reply_markup: markup_of(keyboard),
        };
        let _: serde_json::Value = call(&self.client, &self.url("sendVideo"), &payload).await?;
        Ok(())
    }

    async fn ack_callback(&self, callback_id: &str) -> Result<()> {
        let payload = AnswerCallbackQuery {
            callback_query_id: callback_id,
        };
        let _: serde_json::Value =
            call(&self.client, &self.url("answerCallbackQuery"), &payload).await?;
        Ok(())
    }

    fn self_id(&self) -> i64 {
        self.bot_id
    }
}

/// POST one Bot API method and unwrap the response envelope.
async fn call<T>(client: &Client, url: &str, payload: &impl Serialize) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| GatewayError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        let message = format!("API returned {}: {}", status, body);
        if status.is_client_error() {
            return Err(GatewayError::BadRequest(message).into());
        }
        return Err(GatewayError::Delivery(message).into());
    }

    let envelope: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| GatewayError::Network(e.to_string()))?;

    if !envelope.ok {
        let description = envelope
            .description
            .unwrap_or_else(|| "unknown API error".to_string());
        return Err(GatewayError::Delivery(description).into());
    }

    envelope.result.ok_or_else(|| {
        MediacastError::from(GatewayError::Delivery(
            "API response missing result".to_string(),
        ))
    })
}

/// Map one raw update onto the gateway event model. Updates that carry
/// neither a usable message nor a callback are dropped.
fn convert_update(raw: TgUpdate) -> Option<Update> {
    if let Some(callback) = raw.callback_query {
        let data = callback.data?;
        return Some(Update::Callback(CallbackPress {
            id: callback.id,
            from: sender_of(callback.from),
            data,
        }));
    }

    let message = raw.message?;
    let from = message.from?;

    let media = if let Some(sizes) = message.photo {
        // The last size is the largest rendition.
        sizes.last().map(|p| InboundMedia {
            kind: MediaKind::Photo,
            file_ref: p.file_id.clone(),
        })
    } else {
        message.video.map(|v| InboundMedia {
            kind: MediaKind::Video,
            file_ref: v.file_id,
        })
    };

    Some(Update::Message(InboundMessage {
        from: sender_of(from),
        text: message.text,
        media,
    }))
}

fn sender_of(user: TgUser) -> Sender {
    Sender {
        chat_id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
    }
}

fn markup_of(keyboard: Option<&Keyboard>) -> Option<ReplyMarkup> {
    keyboard.map(|keyboard| ReplyMarkup {
        inline_keyboard: keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| InlineButton {
                        text: button.label.clone(),
                        callback_data: button.data.clone(),
                    })
                    .collect()
            })
            .collect(),
    })
}

// ----------------------------------------------------------------------
// Bot API payloads
// ----------------------------------------------------------------------

#[derive(Serialize)]
struct EmptyPayload {}

#[derive(Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Serialize)]
struct SendVideo<'a> {
    chat_id: &'a str,
    video: &'a str,
    caption: &'a str,
    parse_mode: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<ReplyMarkup>,
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
}

#[derive(Serialize)]
struct ReplyMarkup {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

#[derive(Serialize)]
struct InlineButton {
    text: String,
    callback_data: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
    #[serde(default)]
    callback_query: Option<TgCallback>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    #[serde(default)]
    from: Option<TgUser>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Option<Vec<TgPhotoSize>>,
    #[serde(default)]
    video: Option<TgVideo>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgPhotoSize {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct TgVideo {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct TgCallback {
    id: String,
    from: TgUser,
    #[serde(default)]
    data: Option<String>,
}
