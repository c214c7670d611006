//! Insert-only `SignalStore` trait and the persistence sink built on it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{DatabaseError, SinkError};
use crate::pipeline::dispatcher::SignalSink;
use crate::signal::Signal;

/// One persisted signal row. Column names match the `signals` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalRow {
    pub source: String,
    pub source_label: String,
    pub symbol: String,
    pub action: String,
    pub price: String,
    pub message: Option<String>,
    pub raw_text: Option<String>,
    /// RFC 3339, taken from the signal, not the write time.
    pub created_at: String,
}

impl From<&Signal> for SignalRow {
    fn from(signal: &Signal) -> Self {
        Self {
            source: signal.source().as_str().to_string(),
            source_label: signal.source_label().to_string(),
            symbol: signal.symbol().to_string(),
            action: signal.action().to_string(),
            price: signal.price().to_string(),
            message: signal.message().map(str::to_string),
            raw_text: signal.raw_text().map(str::to_string),
            created_at: signal.created_at().to_rfc3339(),
        }
    }
}

/// Backend-agnostic, insert-only signal persistence.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Insert one row for `signal`.
    async fn insert_signal(&self, signal: &Signal) -> Result<(), DatabaseError>;
}

/// Sink that writes every relayed signal to a `SignalStore`.
pub struct PersistenceSink {
    store: Arc<dyn SignalStore>,
}

impl PersistenceSink {
    pub const NAME: &'static str = "persistence";

    pub fn new(store: Arc<dyn SignalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SignalSink for PersistenceSink {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn deliver(&self, signal: &Signal) -> Result<(), SinkError> {
        self.store
            .insert_signal(signal)
            .await
            .map_err(|e| SinkError::Failure {
                name: format!("{}:{}", Self::NAME, self.store.backend()),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{RawPayload, SignalSource, normalize};

    struct BrokenStore;

    #[async_trait]
    impl SignalStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }

        async fn insert_signal(&self, _signal: &Signal) -> Result<(), DatabaseError> {
            Err(DatabaseError::Request("connection reset".into()))
        }
    }

    #[test]
    fn row_mirrors_signal() {
        let signal = normalize(
            SignalSource::ChatPlatform,
            &RawPayload::Text("sell BANKNIFTY".into()),
        )
        .unwrap();
        let row = SignalRow::from(&signal);
        assert_eq!(row.source, "chat_platform");
        assert_eq!(row.source_label, "Telegram");
        assert_eq!(row.action, "sell");
        assert_eq!(row.raw_text.as_deref(), Some("sell BANKNIFTY"));
        assert_eq!(row.created_at, signal.created_at().to_rfc3339());
    }

    #[tokio::test]
    async fn store_error_becomes_sink_failure() {
        let sink = PersistenceSink::new(Arc::new(BrokenStore));
        let signal =
            normalize(SignalSource::WebhookTool, &RawPayload::Text("{}".into())).unwrap();

        let err = sink.deliver(&signal).await.unwrap_err();
        assert!(matches!(
            err,
            SinkError::Failure { name, reason } if name == "persistence:broken" && reason.contains("connection reset")
        ));
    }
}
