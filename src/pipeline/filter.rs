//! Filter / validation stage.
//!
//! Runs before fan-out so rejected or noisy input never reaches either sink.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::signal::{Signal, SignalSource};

/// Keyword → inferred action, checked in order. "buy" wins when both appear.
const KEYWORD_ACTIONS: &[(&str, &str)] = &[("buy", "buy"), ("sell", "sell")];

/// True when the lowercased text contains "buy" or "sell" as a substring.
pub fn contains_trade_keyword(text: &str) -> bool {
    infer_action(text).is_some()
}

/// Action implied by the first keyword rule the text matches.
pub fn infer_action(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    KEYWORD_ACTIONS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, action)| *action)
}

/// Decide whether a normalized signal should be relayed.
///
/// Chat signals are noise-filtered on their raw text (the explicit `raw_text`
/// argument wins over the one stored on the signal). Structured sources are
/// always relayed; their gate is `SecretGuard`.
pub fn should_relay(signal: &Signal, raw_text: Option<&str>) -> bool {
    match signal.source() {
        SignalSource::ChatPlatform => {
            let relay = raw_text
                .or(signal.raw_text())
                .is_some_and(contains_trade_keyword);
            if !relay {
                debug!("Chat message has no trade keyword, dropping");
            }
            relay
        }
        SignalSource::WebhookTool | SignalSource::SlashCommand => true,
    }
}

/// Shared-secret check for the webhook surface.
#[derive(Clone)]
pub struct SecretGuard {
    expected: SecretString,
}

impl SecretGuard {
    pub fn new(expected: SecretString) -> Self {
        Self { expected }
    }

    /// Verify a caller-supplied secret. A missing secret is a mismatch.
    pub fn verify(&self, supplied: Option<&str>) -> Result<(), RelayError> {
        let Some(supplied) = supplied else {
            warn!("Webhook request without shared secret");
            return Err(RelayError::Unauthorized);
        };

        if secrets_match(self.expected.expose_secret(), supplied) {
            Ok(())
        } else {
            warn!("Webhook shared secret mismatch");
            Err(RelayError::Unauthorized)
        }
    }
}

impl std::fmt::Debug for SecretGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretGuard").finish_non_exhaustive()
    }
}

/// Compare SHA-256 digests with an XOR fold: runtime depends on neither the
/// content nor the length of the inputs.
fn secrets_match(expected: &str, supplied: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(supplied.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
