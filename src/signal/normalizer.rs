//! Normalizer: turns one adapter's raw payload into a canonical `Signal`.
//!
//! Optional-field coercion lives in the `FieldDefault` policy table so the
//! defaulting rule can be tested without any adapter code. Only a payload
//! with no body at all (or one that is not a JSON object on the structured
//! paths) is rejected; missing or odd-typed optional fields never fail.

use serde::Deserialize;
use serde_json::Value;

use crate::error::RelayError;
use crate::pipeline::filter::infer_action;
use crate::signal::model::{NOT_AVAILABLE, Signal, SignalSource, UNKNOWN};

/// Raw inbound payload as handed over by an adapter.
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// No body at all.
    Empty,
    /// Unparsed text body (chat message, or a webhook body not yet decoded).
    Text(String),
    /// Already-decoded JSON body.
    Json(Value),
}

impl RawPayload {
    /// Build from raw HTTP body bytes. Empty or whitespace-only bodies become
    /// `Empty`; bytes that are not valid UTF-8 are a `MalformedPayload`.
    pub fn from_body(body: &[u8]) -> Result<Self, RelayError> {
        let text = std::str::from_utf8(body).map_err(|e| {
            RelayError::MalformedPayload(format!("body is not valid UTF-8: {e}"))
        })?;
        if text.trim().is_empty() {
            Ok(Self::Empty)
        } else {
            Ok(Self::Text(text.to_string()))
        }
    }
}

/// Defaulting policy for the optional Signal fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Symbol,
    Action,
    Price,
    SourceLabel,
}

impl FieldDefault {
    /// Value used when the field is absent, null or blank.
    pub fn default_for(self, source: SignalSource) -> &'static str {
        match self {
            Self::Symbol | Self::Action => UNKNOWN,
            Self::Price => NOT_AVAILABLE,
            Self::SourceLabel => match source {
                SignalSource::WebhookTool => "TradingView",
                SignalSource::ChatPlatform => "Telegram",
                SignalSource::SlashCommand => "Discord",
            },
        }
    }

    /// Apply the policy to an optional raw value.
    pub fn apply(self, source: SignalSource, value: Option<&Value>) -> String {
        value
            .and_then(value_to_text)
            .unwrap_or_else(|| self.default_for(source).to_string())
    }
}

/// Typed view of the structured (webhook / command option) body.
///
/// Every field is kept as a loose JSON value: upstream tools send prices as
/// numbers or strings and occasionally put numbers in `symbol`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub symbol: Option<Value>,
    pub action: Option<Value>,
    pub price: Option<Value>,
    pub source: Option<Value>,
    pub message: Option<Value>,
    pub secret: Option<Value>,
}

impl WebhookPayload {
    /// Decode a JSON value that must be an object.
    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        if !value.is_object() {
            return Err(RelayError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| RelayError::MalformedPayload(e.to_string()))
    }

    /// Decode a text body as a JSON object.
    pub fn from_text(text: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RelayError::MalformedPayload(format!("body is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Caller-supplied shared secret carried in the body, if any.
    pub fn secret(&self) -> Option<String> {
        self.secret.as_ref().and_then(value_to_text)
    }
}

/// Normalize a raw payload from `source` into a `Signal`.
pub fn normalize(source: SignalSource, payload: &RawPayload) -> Result<Signal, RelayError> {
    match (source, payload) {
        (_, RawPayload::Empty) => Err(RelayError::MalformedPayload("no body".into())),
        (SignalSource::ChatPlatform, RawPayload::Text(text)) => Ok(normalize_chat(text)),
        (SignalSource::ChatPlatform, RawPayload::Json(_)) => Err(RelayError::MalformedPayload(
            "chat payload must be text".into(),
        )),
        (_, RawPayload::Text(text)) => {
            Ok(normalize_structured(source, WebhookPayload::from_text(text)?))
        }
        (_, RawPayload::Json(value)) => Ok(normalize_structured(
            source,
            WebhookPayload::from_value(value.clone())?,
        )),
    }
}

/// Build a Signal from an already-decoded structured payload.
pub fn normalize_structured(source: SignalSource, payload: WebhookPayload) -> Signal {
    Signal::new(
        source,
        FieldDefault::SourceLabel.apply(source, payload.source.as_ref()),
        FieldDefault::Symbol.apply(source, payload.symbol.as_ref()),
        FieldDefault::Action.apply(source, payload.action.as_ref()),
        FieldDefault::Price.apply(source, payload.price.as_ref()),
        payload.message.as_ref().and_then(value_to_text),
        None,
    )
}

fn normalize_chat(text: &str) -> Signal {
    let source = SignalSource::ChatPlatform;
    let action = infer_action(text)
        .map(str::to_string)
        .unwrap_or_else(|| FieldDefault::Action.default_for(source).to_string());

    Signal::new(
        source,
        FieldDefault::SourceLabel.default_for(source).to_string(),
        FieldDefault::Symbol.default_for(source).to_string(),
        action,
        FieldDefault::Price.default_for(source).to_string(),
        None,
        Some(text.to_string()),
    )
}

/// Render a loose JSON value as display text. Null and blank strings count as absent.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
