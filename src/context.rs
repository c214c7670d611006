//! Shared state handed to every inbound adapter.

use crate::notify::ChannelHandle;
use crate::pipeline::{Dispatcher, SecretGuard};

/// Everything an adapter needs to run a signal through the pipeline.
#[derive(Clone)]
pub struct RelayContext {
    pub dispatcher: Dispatcher,
    pub guard: SecretGuard,
    /// Notification channel, so `/health` can report whether it resolved.
    pub channel: ChannelHandle,
    /// Brand shown in embed titles and footers.
    pub brand: String,
}

impl RelayContext {
    pub fn new(
        dispatcher: Dispatcher,
        guard: SecretGuard,
        channel: ChannelHandle,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            guard,
            channel,
            brand: brand.into(),
        }
    }
}
