//! Configuration, read from environment variables (optionally via `.env`).

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::notify::discord::DISCORD_API_BASE;
use crate::notify::format::DEFAULT_BRAND;
use crate::pipeline::dispatcher::DEFAULT_SINK_TIMEOUT;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Notification platform settings.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: SecretString,
    pub channel_id: String,
    pub api_base: String,
}

/// Where relayed signals are persisted.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// Remote Supabase / PostgREST endpoint.
    Supabase { url: String, key: SecretString },
    /// Local libSQL database file.
    Local { path: PathBuf },
}

/// Optional chat-bot integration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: SecretString,
    /// Usernames or numeric ids; `*` allows everyone.
    pub allowed_users: Vec<String>,
}

/// Full relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub webhook_secret: SecretString,
    pub discord: DiscordConfig,
    pub store: StoreConfig,
    /// `None` when `TELEGRAM_TOKEN` is unset.
    pub telegram: Option<TelegramConfig>,
    pub sink_timeout: Duration,
    pub brand: String,
}

impl RelayConfig {
    /// Load from the process environment, after merging a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str, hint: &str| {
            get(key).ok_or_else(|| ConfigError::MissingRequired {
                key: key.to_string(),
                hint: hint.to_string(),
            })
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".into(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let webhook_secret = SecretString::from(require(
            "WEBHOOK_SECRET",
            "Set the shared secret webhook callers send in x-webhook-secret.",
        )?);

        let channel_id = get("DISCORD_CHANNEL_ID")
            .or_else(|| get("ALERT_CHANNEL_ID"))
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "DISCORD_CHANNEL_ID".into(),
                hint: "Set the id of the channel alerts are posted to (ALERT_CHANNEL_ID also works).".into(),
            })?;

        let discord = DiscordConfig {
            token: SecretString::from(require(
                "DISCORD_TOKEN",
                "Set the bot token used to post alerts.",
            )?),
            channel_id,
            api_base: get("DISCORD_API_BASE").unwrap_or_else(|| DISCORD_API_BASE.to_string()),
        };

        let store = match (get("SUPABASE_URL"), get("SIGNAL_DB_PATH")) {
            (Some(url), _) => StoreConfig::Supabase {
                url,
                key: SecretString::from(require(
                    "SUPABASE_KEY",
                    "SUPABASE_URL is set, so the service key is required too.",
                )?),
            },
            (None, Some(path)) => StoreConfig::Local {
                path: PathBuf::from(path),
            },
            (None, None) => {
                return Err(ConfigError::MissingRequired {
                    key: "SUPABASE_URL".into(),
                    hint: "Set SUPABASE_URL + SUPABASE_KEY, or SIGNAL_DB_PATH for a local store.".into(),
                });
            }
        };

        let telegram = get("TELEGRAM_TOKEN").map(|token| TelegramConfig {
            token: SecretString::from(token),
            allowed_users: get("TELEGRAM_ALLOWED_USERS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        });

        let sink_timeout = match get("SINK_TIMEOUT_MS") {
            Some(raw) => {
                let ms = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                    key: "SINK_TIMEOUT_MS".into(),
                    message: e.to_string(),
                })?;
                if ms == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "SINK_TIMEOUT_MS".into(),
                        message: "must be greater than zero".into(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_SINK_TIMEOUT,
        };

        Ok(Self {
            port,
            webhook_secret,
            discord,
            store,
            telegram,
            sink_timeout,
            brand: get("RELAY_BRAND").unwrap_or_else(|| DEFAULT_BRAND.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "bot-token"),
        ("DISCORD_CHANNEL_ID", "1234"),
        ("WEBHOOK_SECRET", "s3cret"),
        ("SUPABASE_URL", "https://abc.supabase.co"),
        ("SUPABASE_KEY", "service-key"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs: Vec<_> = REQUIRED.to_vec();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn required_values_with_defaults() {
        let config = RelayConfig::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.webhook_secret.expose_secret(), "s3cret");
        assert_eq!(config.discord.channel_id, "1234");
        assert_eq!(config.discord.api_base, DISCORD_API_BASE);
        assert!(matches!(config.store, StoreConfig::Supabase { ref url, .. } if url == "https://abc.supabase.co"));
        assert!(config.telegram.is_none());
        assert_eq!(config.sink_timeout, DEFAULT_SINK_TIMEOUT);
        assert_eq!(config.brand, DEFAULT_BRAND);
    }

    #[test]
    fn missing_secret_is_reported() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "WEBHOOK_SECRET")
            .collect();
        let err = RelayConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { key, .. } if key == "WEBHOOK_SECRET"));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let err = RelayConfig::from_lookup(lookup(&with(&[("DISCORD_TOKEN", "  ")])))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingRequired { key, .. } if key == "DISCORD_TOKEN"));
    }

    #[test]
    fn alert_channel_id_alias() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "DISCORD_CHANNEL_ID")
            .chain([("ALERT_CHANNEL_ID", "999")])
            .collect();
        let config = RelayConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.discord.channel_id, "999");
    }

    #[test]
    fn local_store_when_no_remote() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| !k.starts_with("SUPABASE"))
            .chain([("SIGNAL_DB_PATH", "./data/signals.db")])
            .collect();
        let config = RelayConfig::from_lookup(lookup(&pairs)).unwrap();
        assert!(matches!(config.store, StoreConfig::Local { ref path } if path.ends_with("signals.db")));
    }

    #[test]
    fn no_store_is_an_error() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| !k.starts_with("SUPABASE"))
            .collect();
        assert!(RelayConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn supabase_url_without_key_is_an_error() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "SUPABASE_KEY")
            .collect();
        let err = RelayConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { key, .. } if key == "SUPABASE_KEY"));
    }

    #[test]
    fn telegram_enabled_by_token() {
        let config = RelayConfig::from_lookup(lookup(&with(&[
            ("TELEGRAM_TOKEN", "123:ABC"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 42 ,"),
        ])))
        .unwrap();
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.allowed_users, vec!["alice", "42"]);
    }

    #[test]
    fn telegram_allows_everyone_by_default() {
        let config =
            RelayConfig::from_lookup(lookup(&with(&[("TELEGRAM_TOKEN", "123:ABC")]))).unwrap();
        assert_eq!(config.telegram.unwrap().allowed_users, vec!["*"]);
    }

    #[test]
    fn invalid_port_and_timeout() {
        assert!(matches!(
            RelayConfig::from_lookup(lookup(&with(&[("PORT", "http")]))),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RelayConfig::from_lookup(lookup(&with(&[("SINK_TIMEOUT_MS", "0")]))),
            Err(ConfigError::InvalidValue { .. })
        ));
        let config =
            RelayConfig::from_lookup(lookup(&with(&[("SINK_TIMEOUT_MS", "250"), ("PORT", "8080")])))
                .unwrap();
        assert_eq!(config.sink_timeout, Duration::from_millis(250));
        assert_eq!(config.port, 8080);
    }
}
