//! Notification channel: Discord REST transport and the notification sink.
//!
//! The target channel is resolved once at startup by a background task and
//! stored in a write-once `ChannelHandle`. Until that happens the sink reports
//! itself unavailable and the dispatcher records `Skipped`.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ChannelError, SinkError};
use crate::notify::format::{StructuredMessage, format_signal};
use crate::pipeline::dispatcher::SignalSink;
use crate::signal::Signal;

/// Default Discord REST API base.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Back-off between channel resolution attempts.
pub const RESOLVE_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// A notification channel the platform confirmed exists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Process-wide, write-once handle to the resolved notification channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelHandle {
    inner: Arc<OnceLock<ResolvedChannel>>,
}

impl ChannelHandle {
    /// An unresolved handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is already resolved (tests, or a pre-known channel).
    pub fn resolved(channel: ResolvedChannel) -> Self {
        let handle = Self::new();
        handle.set(channel);
        handle
    }

    pub fn get(&self) -> Option<&ResolvedChannel> {
        self.inner.get()
    }

    /// Store the channel. Returns false if it was already set.
    pub fn set(&self, channel: ResolvedChannel) -> bool {
        self.inner.set(channel).is_ok()
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// Platform operations the notification sink needs.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Look the channel up on the platform.
    async fn resolve_channel(&self, channel_id: &str) -> Result<ResolvedChannel, ChannelError>;

    /// Post a structured message to a resolved channel.
    async fn send(
        &self,
        channel: &ResolvedChannel,
        message: &StructuredMessage,
    ) -> Result<(), ChannelError>;
}

/// Discord bot REST client.
pub struct DiscordClient {
    token: SecretString,
    api_base: String,
    client: reqwest::Client,
}

impl DiscordClient {
    pub fn new(token: SecretString) -> Self {
        Self::with_api_base(token, DISCORD_API_BASE)
    }

    pub fn with_api_base(token: SecretString, api_base: &str) -> Self {
        Self {
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.token.expose_secret())
    }
}

#[async_trait]
impl NotificationTransport for DiscordClient {
    async fn resolve_channel(&self, channel_id: &str) -> Result<ResolvedChannel, ChannelError> {
        let resp = self
            .client
            .get(self.api_url(&format!("channels/{channel_id}")))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| ChannelError::ResolveFailed {
                id: channel_id.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::ResolveFailed {
                id: channel_id.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        resp.json::<ResolvedChannel>()
            .await
            .map_err(|e| ChannelError::ResolveFailed {
                id: channel_id.to_string(),
                reason: format!("unexpected channel payload: {e}"),
            })
    }

    async fn send(
        &self,
        channel: &ResolvedChannel,
        message: &StructuredMessage,
    ) -> Result<(), ChannelError> {
        let body = serde_json::json!({ "embeds": [message.to_embed()] });

        let resp = self
            .client
            .post(self.api_url(&format!("channels/{}/messages", channel.id)))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "discord".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "discord".into(),
                reason: format!("createMessage returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

/// Resolve `channel_id` in the background, retrying until it succeeds.
///
/// Signals dispatched before this completes are recorded as `Skipped` for
/// the notification sink.
pub fn spawn_channel_resolution(
    transport: Arc<dyn NotificationTransport>,
    channel_id: String,
    handle: ChannelHandle,
    retry_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match transport.resolve_channel(&channel_id).await {
                Ok(channel) => {
                    info!(
                        channel_id = %channel.id,
                        name = channel.name.as_deref().unwrap_or("-"),
                        attempt,
                        "Notification channel resolved"
                    );
                    handle.set(channel);
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Notification channel resolution failed, retrying");
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    })
}

/// Best-effort notification sink.
pub struct NotificationSink {
    transport: Arc<dyn NotificationTransport>,
    handle: ChannelHandle,
    brand: String,
}

impl NotificationSink {
    pub const NAME: &'static str = "notification";

    pub fn new(transport: Arc<dyn NotificationTransport>, handle: ChannelHandle, brand: &str) -> Self {
        Self {
            transport,
            handle,
            brand: brand.to_string(),
        }
    }
}

#[async_trait]
impl SignalSink for NotificationSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn deliver(&self, signal: &Signal) -> Result<(), SinkError> {
        let Some(channel) = self.handle.get() else {
            return Err(SinkError::Unavailable {
                name: Self::NAME.into(),
                reason: "notification channel not resolved yet".into(),
            });
        };

        let message = format_signal(signal, &self.brand);
        self.transport
            .send(channel, &message)
            .await
            .map_err(|e| SinkError::Failure {
                name: Self::NAME.into(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::notify::format::{DEFAULT_BRAND, GREEN};
    use crate::signal::{RawPayload, SignalSource, normalize};

    /// Records sent messages; fails resolution a configurable number of times.
    #[derive(Default)]
    struct FakeTransport {
        resolve_failures: AtomicUsize,
        resolve_calls: AtomicUsize,
        fail_send: bool,
        sent: Mutex<Vec<(String, StructuredMessage)>>,
    }

    #[async_trait]
    impl NotificationTransport for FakeTransport {
        async fn resolve_channel(&self, channel_id: &str) -> Result<ResolvedChannel, ChannelError> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            if self.resolve_failures.load(Ordering::SeqCst) > 0 {
                self.resolve_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ChannelError::ResolveFailed {
                    id: channel_id.into(),
                    reason: "gateway down".into(),
                });
            }
            Ok(ResolvedChannel {
                id: channel_id.into(),
                name: Some("alerts".into()),
            })
        }

        async fn send(
            &self,
            channel: &ResolvedChannel,
            message: &StructuredMessage,
        ) -> Result<(), ChannelError> {
            if self.fail_send {
                return Err(ChannelError::SendFailed {
                    name: "discord".into(),
                    reason: "503".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel.id.clone(), message.clone()));
            Ok(())
        }
    }

    fn channel() -> ResolvedChannel {
        ResolvedChannel {
            id: "42".into(),
            name: None,
        }
    }

    fn buy_signal() -> Signal {
        normalize(
            SignalSource::WebhookTool,
            &RawPayload::Json(serde_json::json!({"symbol": "NIFTY", "action": "Buy"})),
        )
        .unwrap()
    }

    #[test]
    fn handle_is_write_once() {
        let handle = ChannelHandle::new();
        assert!(!handle.is_resolved());
        assert!(handle.set(channel()));
        assert!(!handle.set(ResolvedChannel {
            id: "other".into(),
            name: None
        }));
        assert_eq!(handle.get().unwrap().id, "42");
    }

    #[test]
    fn cloned_handles_share_state() {
        let handle = ChannelHandle::new();
        let clone = handle.clone();
        handle.set(channel());
        assert!(clone.is_resolved());
    }

    #[test]
    fn discord_api_url() {
        let client = DiscordClient::with_api_base(SecretString::from("t"), "http://localhost:9/api/");
        assert_eq!(client.api_url("channels/1"), "http://localhost:9/api/channels/1");
        let client = DiscordClient::new(SecretString::from("t"));
        assert_eq!(
            client.api_url("/channels/1/messages"),
            "https://discord.com/api/v10/channels/1/messages"
        );
    }

    #[tokio::test]
    async fn unresolved_channel_is_unavailable() {
        let transport = Arc::new(FakeTransport::default());
        let sink = NotificationSink::new(transport.clone(), ChannelHandle::new(), DEFAULT_BRAND);

        let err = sink.deliver(&buy_signal()).await.unwrap_err();

        assert!(matches!(err, SinkError::Unavailable { .. }));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolved_channel_receives_formatted_message() {
        let transport = Arc::new(FakeTransport::default());
        let sink = NotificationSink::new(
            transport.clone(),
            ChannelHandle::resolved(channel()),
            DEFAULT_BRAND,
        );

        sink.deliver(&buy_signal()).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "42");
        assert_eq!(sent[0].1.title, "NIFTY Signal");
        assert_eq!(sent[0].1.color, GREEN);
    }

    #[tokio::test]
    async fn transport_error_is_sink_failure() {
        let transport = Arc::new(FakeTransport {
            fail_send: true,
            ..Default::default()
        });
        let sink = NotificationSink::new(transport, ChannelHandle::resolved(channel()), DEFAULT_BRAND);

        let err = sink.deliver(&buy_signal()).await.unwrap_err();
        assert!(matches!(err, SinkError::Failure { reason, .. } if reason.contains("503")));
    }

    #[tokio::test]
    async fn resolution_retries_until_success() {
        let transport = Arc::new(FakeTransport {
            resolve_failures: AtomicUsize::new(2),
            ..Default::default()
        });
        let handle = ChannelHandle::new();

        spawn_channel_resolution(
            transport.clone(),
            "42".into(),
            handle.clone(),
            Duration::from_millis(5),
        )
        .await
        .unwrap();

        assert!(handle.is_resolved());
        assert_eq!(handle.get().unwrap().name.as_deref(), Some("alerts"));
        assert_eq!(transport.resolve_calls.load(Ordering::SeqCst), 3);
    }

    mod stub {
        use std::sync::{Arc, Mutex};

        use axum::{
            Json, Router,
            body::Bytes,
            extract::State,
            http::{HeaderMap, Method, StatusCode, Uri},
        };
        use serde_json::Value;

        /// One request seen by the stub API.
        #[derive(Debug, Clone)]
        pub struct Recorded {
            pub method: Method,
            pub path: String,
            pub headers: HeaderMap,
            pub body: Value,
        }

        #[derive(Clone)]
        struct StubState {
            seen: Arc<Mutex<Vec<Recorded>>>,
            status: StatusCode,
            reply: Value,
        }

        async fn record(
            State(state): State<StubState>,
            method: Method,
            uri: Uri,
            headers: HeaderMap,
            body: Bytes,
        ) -> (StatusCode, Json<Value>) {
            state.seen.lock().unwrap().push(Recorded {
                method,
                path: uri.path().to_string(),
                headers,
                body: serde_json::from_slice(&body).unwrap_or(Value::Null),
            });
            (state.status, Json(state.reply.clone()))
        }

        /// Serve every path with `status` + `reply`, recording requests.
        pub async fn serve(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Recorded>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let app = Router::new().fallback(record).with_state(StubState {
                seen: seen.clone(),
                status,
                reply,
            });
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}/api/v10", listener.local_addr().unwrap());
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            (base, seen)
        }
    }

    #[tokio::test]
    async fn discord_resolve_gets_channel_with_bot_auth() {
        let (base, seen) = stub::serve(
            axum::http::StatusCode::OK,
            serde_json::json!({"id": "42", "name": "alerts", "type": 0}),
        )
        .await;
        let client = DiscordClient::with_api_base(SecretString::from("bot-token"), &base);

        let resolved = client.resolve_channel("42").await.unwrap();

        assert_eq!(resolved, ResolvedChannel { id: "42".into(), name: Some("alerts".into()) });
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, axum::http::Method::GET);
        assert_eq!(seen[0].path, "/api/v10/channels/42");
        assert_eq!(seen[0].headers["authorization"], "Bot bot-token");
    }

    #[tokio::test]
    async fn discord_send_posts_embed_with_bot_auth() {
        let (base, seen) =
            stub::serve(axum::http::StatusCode::OK, serde_json::json!({"id": "9001"})).await;
        let client = DiscordClient::with_api_base(SecretString::from("bot-token"), &base);
        let msg = format_signal(&buy_signal(), DEFAULT_BRAND);

        client.send(&channel(), &msg).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, axum::http::Method::POST);
        assert_eq!(seen[0].path, "/api/v10/channels/42/messages");
        assert_eq!(seen[0].headers["authorization"], "Bot bot-token");
        let embeds = seen[0].body["embeds"].as_array().unwrap();
        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0]["title"], "NIFTY Signal");
        assert_eq!(embeds[0]["color"], GREEN);
    }

    #[tokio::test]
    async fn discord_non_success_status_is_error() {
        let (base, _seen) = stub::serve(
            axum::http::StatusCode::FORBIDDEN,
            serde_json::json!({"message": "Missing Access", "code": 50001}),
        )
        .await;
        let client = DiscordClient::with_api_base(SecretString::from("bot-token"), &base);
        let msg = format_signal(&buy_signal(), DEFAULT_BRAND);

        let err = client.send(&channel(), &msg).await.unwrap_err();
        assert!(matches!(err, ChannelError::SendFailed { reason, .. } if reason.contains("403")));

        let err = client.resolve_channel("42").await.unwrap_err();
        assert!(matches!(err, ChannelError::ResolveFailed { reason, .. } if reason.contains("Missing Access")));
    }

    #[tokio::test]
    async fn discord_send_to_unreachable_api_fails() {
        let client =
            DiscordClient::with_api_base(SecretString::from("fake-token"), "http://127.0.0.1:1");
        let msg = format_signal(&buy_signal(), DEFAULT_BRAND);

        let result = client.send(&channel(), &msg).await;
        assert!(matches!(result, Err(ChannelError::SendFailed { .. })));

        let result = client.resolve_channel("42").await;
        assert!(matches!(result, Err(ChannelError::ResolveFailed { .. })));
    }
}
