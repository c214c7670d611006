//! Inbound surfaces. Each one turns its input into a `Signal` (or a command
//! reply) and hands it to the shared pipeline.

pub mod chat;
pub mod command;
pub mod webhook;

pub use chat::{ChatOutcome, handle_chat_text, run_chat_channel};
pub use command::{RiskOptions, handle_risk, parse_text_command};
pub use webhook::{SECRET_HEADER, relay_routes};
