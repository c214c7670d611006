//! Signal model shared by every adapter and sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for a symbol or action the upstream did not provide.
pub const UNKNOWN: &str = "Unknown";

/// Sentinel for a price the upstream did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Where a signal originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// HTTP webhook from a charting/automation tool.
    WebhookTool,
    /// Free-text message from the chat-bot stream.
    ChatPlatform,
    /// Slash command on the notification platform.
    SlashCommand,
}

impl SignalSource {
    /// Stable label used in logs and persisted rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebhookTool => "webhook_tool",
            Self::ChatPlatform => "chat_platform",
            Self::SlashCommand => "slash_command",
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical, normalized trading signal.
///
/// Fields are private so a `Signal` can only be built by the normalizer and
/// never mutated afterwards. `symbol`, `action` and `price` always hold a value:
/// absence is encoded with the `UNKNOWN` / `NOT_AVAILABLE` sentinels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    source: SignalSource,
    source_label: String,
    symbol: String,
    action: String,
    price: String,
    message: Option<String>,
    raw_text: Option<String>,
    created_at: DateTime<Utc>,
}

impl Signal {
    pub(crate) fn new(
        source: SignalSource,
        source_label: String,
        symbol: String,
        action: String,
        price: String,
        message: Option<String>,
        raw_text: Option<String>,
    ) -> Self {
        Self {
            source,
            source_label,
            symbol,
            action,
            price,
            message,
            raw_text,
            created_at: Utc::now(),
        }
    }

    pub fn source(&self) -> SignalSource {
        self.source
    }

    /// Upstream tool label, e.g. "TradingView" or "Telegram".
    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    /// Free-form alert text from the webhook payload.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Original chat text, verbatim.
    pub fn raw_text(&self) -> Option<&str> {
        self.raw_text.as_deref()
    }

    /// Set once at normalization time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn has_known_symbol(&self) -> bool {
        self.symbol != UNKNOWN
    }

    /// True when the action is exactly "buy", ignoring case.
    pub fn is_buy(&self) -> bool {
        self.action.eq_ignore_ascii_case("buy")
    }

    /// Compare every field except `created_at`.
    pub fn same_content(&self, other: &Signal) -> bool {
        self.source == other.source
            && self.source_label == other.source_label
            && self.symbol == other.symbol
            && self.action == other.action
            && self.price == other.price
            && self.message == other.message
            && self.raw_text == other.raw_text
    }
}
