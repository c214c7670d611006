//! Remote signal store: PostgREST insert into a Supabase `signals` table.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::DatabaseError;
use crate::signal::Signal;
use crate::store::traits::{SignalRow, SignalStore};

/// Table the relay inserts into.
pub const SIGNALS_TABLE: &str = "signals";

/// Supabase (PostgREST) signal store.
pub struct SupabaseStore {
    base_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{SIGNALS_TABLE}", self.base_url)
    }
}

#[async_trait]
impl SignalStore for SupabaseStore {
    fn backend(&self) -> &'static str {
        "supabase"
    }

    async fn insert_signal(&self, signal: &Signal) -> Result<(), DatabaseError> {
        let row = SignalRow::from(signal);
        let key = self.api_key.expose_secret();

        let resp = self
            .client
            .post(self.table_url())
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .await
            .map_err(|e| DatabaseError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DatabaseError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(symbol = signal.symbol(), "Signal inserted into Supabase");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    };

    use super::*;
    use crate::signal::{RawPayload, SignalSource, normalize};

    type Seen = Arc<Mutex<Vec<(HeaderMap, serde_json::Value)>>>;

    /// Local PostgREST stand-in answering `POST /rest/v1/signals` with `status`.
    async fn stub_rest(status: StatusCode) -> (String, Seen) {
        async fn insert(
            State((seen, status)): State<(Seen, StatusCode)>,
            headers: HeaderMap,
            body: Bytes,
        ) -> (StatusCode, &'static str) {
            let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
            seen.lock().unwrap().push((headers, body));
            let reply = if status.is_success() {
                ""
            } else {
                r#"{"code":"23502","message":"null value in column"}"#
            };
            (status, reply)
        }

        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/rest/v1/signals", post(insert))
            .with_state((seen.clone(), status));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (base, seen)
    }

    fn nifty_signal() -> Signal {
        normalize(
            SignalSource::WebhookTool,
            &RawPayload::Json(serde_json::json!({"symbol": "NIFTY", "action": "Buy", "price": 19500})),
        )
        .unwrap()
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let store = SupabaseStore::new("https://abc.supabase.co/", SecretString::from("k"));
        assert_eq!(store.table_url(), "https://abc.supabase.co/rest/v1/signals");
    }

    #[test]
    fn row_serializes_with_table_columns() {
        let signal = normalize(
            SignalSource::WebhookTool,
            &RawPayload::Json(serde_json::json!({"symbol": "NIFTY", "price": 19500})),
        )
        .unwrap();
        let json = serde_json::to_value([SignalRow::from(&signal)]).unwrap();
        let row = &json[0];
        for column in [
            "source",
            "source_label",
            "symbol",
            "action",
            "price",
            "message",
            "raw_text",
            "created_at",
        ] {
            assert!(row.get(column).is_some(), "missing column {column}");
        }
        assert_eq!(row["price"], "19500");
        assert!(row["raw_text"].is_null());
    }

    #[tokio::test]
    async fn insert_posts_row_array_with_key_headers() {
        let (base, seen) = stub_rest(StatusCode::CREATED).await;
        let store = SupabaseStore::new(&base, SecretString::from("service-key"));

        store.insert_signal(&nifty_signal()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (headers, body) = &seen[0];
        assert_eq!(headers["apikey"], "service-key");
        assert_eq!(headers["authorization"], "Bearer service-key");
        assert_eq!(headers["prefer"], "return=minimal");
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["symbol"], "NIFTY");
        assert_eq!(rows[0]["action"], "Buy");
        assert_eq!(rows[0]["price"], "19500");
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (base, _seen) = stub_rest(StatusCode::BAD_REQUEST).await;
        let store = SupabaseStore::new(&base, SecretString::from("service-key"));

        let err = store.insert_signal(&nifty_signal()).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Rejected { status: 400, ref body } if body.contains("23502")
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let store = SupabaseStore::new("http://127.0.0.1:1", SecretString::from("k"));
        let signal =
            normalize(SignalSource::WebhookTool, &RawPayload::Text("{}".into())).unwrap();

        let err = store.insert_signal(&signal).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Request(_)));
    }
}
