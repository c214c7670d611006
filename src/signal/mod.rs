//! Canonical signal record and the normalizer that builds it.

pub mod model;
pub mod normalizer;

pub use model::{NOT_AVAILABLE, Signal, SignalSource, UNKNOWN};
pub use normalizer::{FieldDefault, RawPayload, WebhookPayload, normalize, normalize_structured};
