//! Outbound notification: message formatting and the Discord channel sink.

pub mod discord;
pub mod format;

pub use discord::{
    ChannelHandle, DiscordClient, NotificationSink, NotificationTransport, ResolvedChannel,
    spawn_channel_resolution,
};
pub use format::{StructuredMessage, format_risk, format_signal};
