//! Fan-out dispatcher.
//!
//! Delivers one `Signal` to every configured sink. Sinks run independently in
//! their own tasks with their own timeout: one sink failing, hanging or
//! panicking never prevents or rolls back another. `dispatch` always returns
//! a `DispatchResult`; it never surfaces an error to its caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::signal::Signal;

/// Default bound on a single sink call.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(5);

/// A downstream consumer of normalized signals.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Short name used in logs and in `DispatchResult`.
    fn name(&self) -> &str;

    /// Deliver one signal. Return `SinkError::Unavailable` when the sink has
    /// no usable handle yet; the dispatcher records that as `Skipped`.
    async fn deliver(&self, signal: &Signal) -> Result<(), SinkError>;
}

/// Outcome of one sink for one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SinkOutcome {
    Delivered,
    Skipped,
    Failed(String),
}

/// Per-sink outcome entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReport {
    pub sink: String,
    pub outcome: SinkOutcome,
}

/// Result of fanning one signal out to all sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub reports: Vec<SinkReport>,
}

impl DispatchResult {
    /// Outcome recorded for the named sink.
    pub fn outcome(&self, sink: &str) -> Option<&SinkOutcome> {
        self.reports
            .iter()
            .find(|r| r.sink == sink)
            .map(|r| &r.outcome)
    }

    /// Number of sinks that confirmed delivery.
    pub fn delivered(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome == SinkOutcome::Delivered)
            .count()
    }

    pub fn all_delivered(&self) -> bool {
        self.delivered() == self.reports.len()
    }
}

/// Fans signals out to a fixed set of sinks.
#[derive(Clone)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn SignalSink>>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(sinks: Vec<Arc<dyn SignalSink>>) -> Self {
        Self {
            sinks,
            timeout: DEFAULT_SINK_TIMEOUT,
        }
    }

    /// Override the per-sink timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver `signal` to every sink and collect per-sink outcomes.
    ///
    /// All sinks observe the same immutable value.
    pub async fn dispatch(&self, signal: Signal) -> DispatchResult {
        let signal = Arc::new(signal);

        let handles: Vec<_> = self
            .sinks
            .iter()
            .map(|sink| {
                let sink = Arc::clone(sink);
                let signal = Arc::clone(&signal);
                let timeout = self.timeout;
                let name = sink.name().to_string();
                let handle = tokio::spawn(async move {
                    match tokio::time::timeout(timeout, sink.deliver(&signal)).await {
                        Ok(result) => result,
                        Err(_) => Err(SinkError::Timeout {
                            name: sink.name().to_string(),
                            timeout,
                        }),
                    }
                });
                (name, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (sink, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(())) => SinkOutcome::Delivered,
                Ok(Err(SinkError::Unavailable { reason, .. })) => {
                    warn!(sink = %sink, reason = %reason, "Sink unavailable, skipping");
                    SinkOutcome::Skipped
                }
                Ok(Err(e)) => SinkOutcome::Failed(e.to_string()),
                Err(join_err) => SinkOutcome::Failed(format!("sink task panicked: {join_err}")),
            };

            match &outcome {
                SinkOutcome::Delivered => info!(
                    sink = %sink,
                    symbol = signal.symbol(),
                    source = %signal.source(),
                    "Signal delivered"
                ),
                SinkOutcome::Failed(reason) => {
                    warn!(sink = %sink, reason = %reason, "Signal delivery failed")
                }
                SinkOutcome::Skipped => {}
            }

            reports.push(SinkReport { sink, outcome });
        }

        DispatchResult { reports }
    }
}
