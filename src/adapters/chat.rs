//! Chat-bot surface: every message from a listened-to channel goes through
//! the keyword filter; `/risk` text commands get a reply instead.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::adapters::command::{error_reply, handle_risk, parse_text_command};
use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::context::RelayContext;
use crate::error::{ChannelError, RelayError};
use crate::pipeline::{DispatchResult, should_relay};
use crate::signal::{RawPayload, SignalSource, normalize};

/// What happened to one chat message.
#[derive(Debug)]
pub enum ChatOutcome {
    /// No trade keyword; nothing was dispatched.
    Dropped,
    /// Normalized and fanned out.
    Relayed(DispatchResult),
    /// A command was handled; the text goes back to the sender.
    Reply(String),
}

/// Run one chat message through the pipeline.
pub async fn handle_chat_text(ctx: &RelayContext, text: &str) -> Result<ChatOutcome, RelayError> {
    if let Some(parsed) = parse_text_command(text) {
        let reply = match parsed.and_then(|opts| handle_risk(&opts, &ctx.brand)) {
            Ok(message) => message.render_text(),
            Err(e) => error_reply(&e),
        };
        return Ok(ChatOutcome::Reply(reply));
    }

    if text.trim().is_empty() {
        return Ok(ChatOutcome::Dropped);
    }

    let signal = normalize(SignalSource::ChatPlatform, &RawPayload::Text(text.to_string()))?;
    if !should_relay(&signal, Some(text)) {
        return Ok(ChatOutcome::Dropped);
    }

    Ok(ChatOutcome::Relayed(ctx.dispatcher.dispatch(signal).await))
}

/// Listen on `channel` until its stream ends. Each message is handled on
/// its own task.
pub async fn run_chat_channel(
    channel: Arc<dyn Channel>,
    ctx: Arc<RelayContext>,
) -> Result<(), ChannelError> {
    let mut stream = channel.start().await?;
    info!(channel = channel.name(), "Chat adapter listening");

    while let Some(msg) = stream.next().await {
        let channel = Arc::clone(&channel);
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            handle_incoming(channel.as_ref(), &ctx, msg).await;
        });
    }

    warn!(channel = channel.name(), "Chat message stream ended");
    Ok(())
}

async fn handle_incoming(channel: &dyn Channel, ctx: &RelayContext, msg: IncomingMessage) {
    match handle_chat_text(ctx, &msg.content).await {
        Ok(ChatOutcome::Reply(text)) => {
            if let Err(e) = channel.respond(&msg, OutgoingResponse::text(text)).await {
                warn!(channel = channel.name(), error = %e, "Failed to send command reply");
            }
        }
        Ok(ChatOutcome::Relayed(result)) => debug!(
            channel = channel.name(),
            user = %msg.user_id,
            delivered = result.delivered(),
            "Chat signal relayed"
        ),
        Ok(ChatOutcome::Dropped) => {}
        Err(e) => warn!(channel = channel.name(), error = %e, "Chat message rejected"),
    }
}
