//! Chat-platform channels (optional inbound surface).

pub mod channel;
pub mod telegram;

pub use channel::*;
pub use telegram::TelegramChannel;
