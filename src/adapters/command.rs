//! `risk` slash command: option parsing and reply formatting.
//!
//! Reachable over HTTP (`POST /commands/risk`) and as a chat text command
//! (`/risk <capital> <riskpercent> <stoploss> [symbol]`).

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::RelayError;
use crate::notify::{StructuredMessage, format_risk};
use crate::risk::compute_risk;

/// Chat prefix that triggers the risk command.
pub const RISK_COMMAND: &str = "/risk";

/// Named options of the `risk` command. Missing values are rejected by
/// `handle_risk`, not by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RiskOptions {
    pub capital: Option<Decimal>,
    pub riskpercent: Option<Decimal>,
    pub stoploss: Option<Decimal>,
    pub symbol: Option<String>,
}

/// Run the calculator and format the gold reply embed.
pub fn handle_risk(options: &RiskOptions, brand: &str) -> Result<StructuredMessage, RelayError> {
    let calc = compute_risk(
        required("capital", options.capital)?,
        required("riskpercent", options.riskpercent)?,
        required("stoploss", options.stoploss)?,
    )?;

    tracing::info!(
        capital = %calc.capital,
        risk_amount = %calc.risk_amount,
        position_size = %calc.position_size,
        "Risk calculated"
    );

    Ok(format_risk(&calc, options.symbol.as_deref(), brand))
}

/// Parse a chat text command.
///
/// Returns `None` when `text` is not a risk command at all, so ordinary
/// chat messages fall through to the signal path.
pub fn parse_text_command(text: &str) -> Option<Result<RiskOptions, RelayError>> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?;
    // Telegram appends the bot name in groups: /risk@SignalBot
    let command = head.split('@').next().unwrap_or(head);
    if !command.eq_ignore_ascii_case(RISK_COMMAND) {
        return None;
    }

    let args: Vec<&str> = parts.collect();
    if args.len() < 3 {
        return Some(Err(RelayError::InvalidInput(format!(
            "usage: {RISK_COMMAND} <capital> <riskpercent> <stoploss> [symbol]"
        ))));
    }

    Some(parse_args(&args))
}

fn parse_args(args: &[&str]) -> Result<RiskOptions, RelayError> {
    let symbol = args.get(3..).map(|rest| rest.join(" ")).filter(|s| !s.is_empty());
    Ok(RiskOptions {
        capital: Some(parse_decimal("capital", args[0])?),
        riskpercent: Some(parse_decimal("riskpercent", args[1])?),
        stoploss: Some(parse_decimal("stoploss", args[2])?),
        symbol,
    })
}

fn parse_decimal(name: &str, raw: &str) -> Result<Decimal, RelayError> {
    let cleaned: String = raw.trim_end_matches('%').chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned)
        .map_err(|_| RelayError::InvalidInput(format!("{name} must be a number (got {raw:?})")))
}

fn required(name: &str, value: Option<Decimal>) -> Result<Decimal, RelayError> {
    value.ok_or_else(|| RelayError::InvalidInput(format!("{name} is required")))
}

/// Text reply for a rejected command.
pub fn error_reply(err: &RelayError) -> String {
    format!("⚠️ {err}")
}
