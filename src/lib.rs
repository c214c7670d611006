//! Signal relay: receives trading signals from webhooks and chat, fans
//! them out to a notification channel and a persistent store.

pub mod adapters;
pub mod channels;
pub mod config;
pub mod context;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod risk;
pub mod signal;
pub mod store;
