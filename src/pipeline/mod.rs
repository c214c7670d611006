//! Signal processing pipeline.
//!
//! Every inbound surface feeds the same stages:
//! 1. `signal::normalize()`: build the canonical `Signal`
//! 2. `filter`: shared-secret check and chat keyword filter
//! 3. `Dispatcher::dispatch()`: concurrent fan-out to every sink
//!
//! Sinks are independent: one failing never blocks or rolls back another.

pub mod dispatcher;
pub mod filter;

pub use dispatcher::{DispatchResult, Dispatcher, SignalSink, SinkOutcome, SinkReport};
pub use filter::{SecretGuard, contains_trade_keyword, infer_action, should_relay};
