//! Telegram channel: long-polls the Bot API for chat messages.
//!
//! Optional inbound surface. Every text message from an allowed user is
//! forwarded to the chat adapter; replies (risk command results) go back
//! through `sendMessage`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Bot API host.
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Back-off after a failed poll.
const POLL_ERROR_BACKOFF: std::time::Duration = std::time::Duration::from_secs(5);

/// Telegram channel. Connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self::with_api_base(bot_token, allowed_users, TELEGRAM_API_BASE)
    }

    pub fn with_api_base(bot_token: SecretString, allowed_users: Vec<String>, api_base: &str) -> Self {
        Self {
            bot_token,
            allowed_users,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.api_base, &self.bot_token, method)
    }

    /// Send a text message, splitting anything over Telegram's 4096 char limit.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in &split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            self.send_message_chunk(chat_id, chunk).await?;
        }
        Ok(())
    }

    /// Send a single message chunk, Markdown first with a plain-text fallback.
    async fn send_message_chunk(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let markdown_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let poll_url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message"]
                });

                let resp = match client
                    .post(&poll_url)
                    .json(&body)
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let status = resp.status();
                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!(%status, "Telegram parse error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let results = match poll_results(&data) {
                    Ok(results) => results,
                    Err(reason) => {
                        tracing::warn!(%status, "Telegram getUpdates failed: {reason}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                for update in results {
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(chat_id, &response.content).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(api_base: &str, bot_token: &SecretString, method: &str) -> String {
    format!("{api_base}/bot{}/{method}", bot_token.expose_secret())
}

/// Updates carried by a getUpdates reply, or the API's error description
/// (`{"ok": false, ...}` on a revoked token, a competing poller, rate limits).
fn poll_results(data: &Value) -> Result<&Vec<Value>, String> {
    if data.get("ok").and_then(Value::as_bool) == Some(false) {
        let description = data
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description");
        return Err(description.to_string());
    }
    data.get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| "reply has no result array".to_string())
}

/// Turn one getUpdates entry into an `IncomingMessage`.
///
/// Returns `None` for non-message updates, messages without text, and
/// senders that are not on the allowlist.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    let message = update.get("message")?;
    let text = message.get("text").and_then(Value::as_str)?;

    let from = message.get("from");
    let username = from
        .and_then(|f| f.get("username"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let user_id = from
        .and_then(|f| f.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string());

    let mut identities = vec![username];
    if let Some(ref id) = user_id {
        identities.push(id.as_str());
    }
    if !check_user_allowed(allowed_users, identities) {
        tracing::warn!(
            "Telegram: ignoring message from unauthorized user: \
             username={username}, user_id={}",
            user_id.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let first_name = from
        .and_then(|f| f.get("first_name"))
        .and_then(Value::as_str);

    Some(
        IncomingMessage::new("telegram", user_id.as_deref().unwrap_or(username), text)
            .with_metadata(serde_json::json!({
                "chat_id": chat_id,
                "username": username,
            }))
            .with_user_name(first_name.unwrap_or(username)),
    )
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }
        let chunk = &remaining[..cut];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(cut);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { cut } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
