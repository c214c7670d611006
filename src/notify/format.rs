//! Notification formatter: builds platform-neutral structured messages.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::risk::RiskCalculation;
use crate::signal::{NOT_AVAILABLE, Signal};

/// Color for "buy" signals.
pub const GREEN: u32 = 0x00FF00;
/// Color for every other action, "Unknown" included.
pub const RED: u32 = 0xFF0000;
/// Color for risk calculator replies.
pub const GOLD: u32 = 0xFFD700;

/// Brand shown in titles and footers.
pub const DEFAULT_BRAND: &str = "AB GROUP’S";

/// A named field of a structured message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Title / description / fields / color / timestamp message, rendered by
/// each platform in its own way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredMessage {
    pub title: String,
    pub description: Vec<String>,
    pub fields: Vec<EmbedField>,
    pub color: u32,
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StructuredMessage {
    /// Discord embed JSON.
    pub fn to_embed(&self) -> serde_json::Value {
        let mut embed = serde_json::json!({
            "title": self.title,
            "color": self.color,
            "timestamp": self.timestamp.to_rfc3339(),
        });
        if !self.description.is_empty() {
            embed["description"] = serde_json::Value::String(self.description.join("\n"));
        }
        if !self.fields.is_empty() {
            embed["fields"] = serde_json::json!(self.fields);
        }
        if let Some(footer) = &self.footer {
            embed["footer"] = serde_json::json!({ "text": footer });
        }
        embed
    }

    /// Plain-text rendering for chat surfaces without embeds.
    pub fn render_text(&self) -> String {
        let mut lines = vec![self.title.clone()];
        lines.extend(self.description.iter().map(|l| l.replace("**", "")));
        lines.extend(self.fields.iter().map(|f| format!("{}: {}", f.name, f.value)));
        if let Some(footer) = &self.footer {
            lines.push(format!("— {footer}"));
        }
        lines.join("\n")
    }
}

/// Format a relayed signal.
///
/// Green only when the action is exactly "buy" (any case); everything else,
/// "sell" and "Unknown" included, is red.
pub fn format_signal(signal: &Signal, brand: &str) -> StructuredMessage {
    let title = if signal.has_known_symbol() {
        format!("{} Signal", signal.symbol())
    } else {
        format!("📈 {brand} Alert")
    };

    let mut description = vec![
        format!("**Action:** {}", signal.action()),
        format!("**Price:** {}", signal.price()),
        format!("**Source:** {}", signal.source_label()),
    ];
    if let Some(message) = signal.message() {
        description.push(format!("**Info:** {message}"));
    }
    if let Some(text) = signal.raw_text() {
        description.push(format!("> {text}"));
    }

    StructuredMessage {
        title,
        description,
        fields: Vec::new(),
        color: if signal.is_buy() { GREEN } else { RED },
        footer: Some(footer(brand)),
        timestamp: signal.created_at(),
    }
}

/// Format a risk calculator reply.
pub fn format_risk(calc: &RiskCalculation, symbol: Option<&str>, brand: &str) -> StructuredMessage {
    let field = |name: &str, value: String| EmbedField {
        name: name.to_string(),
        value,
        inline: true,
    };

    StructuredMessage {
        title: format!("📊 {brand} Risk Calculator"),
        description: Vec::new(),
        fields: vec![
            field("🏦 Capital", group_thousands(calc.capital)),
            field("🎯 Risk %", format!("{}%", calc.risk_percent.normalize())),
            field("💸 Risk Amount", format!("{:.2}", calc.risk_amount)),
            field("⚡ Position Size", format!("{:.2}", calc.position_size)),
            field(
                "📌 Symbol",
                symbol
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string(),
            ),
        ],
        color: GOLD,
        footer: Some(footer(brand)),
        timestamp: Utc::now(),
    }
}

fn footer(brand: &str) -> String {
    format!("{brand} – Trade Smart")
}

/// `100000` → `100,000`; `1234.5` → `1,234.5`. At most two decimals are kept.
pub fn group_thousands(value: Decimal) -> String {
    let rendered = value.round_dp(2).normalize().to_string();
    let (sign, unsigned) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
