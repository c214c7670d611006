//! HTTP surface: webhook receiver, risk command endpoint and health check.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::adapters::command::{RiskOptions, handle_risk};
use crate::context::RelayContext;
use crate::error::RelayError;
use crate::pipeline::should_relay;
use crate::signal::{RawPayload, SignalSource, WebhookPayload, normalize_structured};

/// Header carrying the shared secret. Checked before the body is parsed.
pub const SECRET_HEADER: &str = "x-webhook-secret";

/// Body returned once a webhook signal has been dispatched.
pub const ACK_BODY: &str = "Signal received";

/// Build the relay router.
pub fn relay_routes(ctx: Arc<RelayContext>) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/commands/risk", post(risk_command))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health(State(ctx): State<Arc<RelayContext>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "notification_channel_resolved": ctx.channel.is_resolved(),
        "sinks": ctx.dispatcher.sink_count(),
    }))
}

/// Secret from the header, `None` when the header is absent. A header that
/// is present but not readable text counts as a mismatch.
fn header_secret(headers: &HeaderMap) -> Result<Option<&str>, RelayError> {
    let Some(value) = headers.get(SECRET_HEADER) else {
        return Ok(None);
    };
    value.to_str().map(Some).map_err(|_| {
        warn!("Webhook shared secret header is not readable text");
        RelayError::Unauthorized
    })
}

/// `POST /webhook`: authenticate, normalize, fan out, acknowledge.
///
/// Auth failures return before any sink runs. Sink outcomes never change
/// the response; they are only logged.
async fn receive_webhook(
    State(ctx): State<Arc<RelayContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), RelayError> {
    let from_header = header_secret(&headers)?;
    if from_header.is_some() {
        ctx.guard.verify(from_header)?;
    }

    let decoded = RawPayload::from_body(&body).and_then(|raw| match raw {
        RawPayload::Empty => Err(RelayError::MalformedPayload("no body".into())),
        RawPayload::Text(text) => WebhookPayload::from_text(&text),
        RawPayload::Json(value) => WebhookPayload::from_value(value),
    });

    if from_header.is_none() {
        let from_body = decoded.as_ref().ok().and_then(WebhookPayload::secret);
        ctx.guard.verify(from_body.as_deref())?;
    }

    let signal = normalize_structured(SignalSource::WebhookTool, decoded?);
    if !should_relay(&signal, None) {
        debug!("Webhook signal filtered");
        return Ok((StatusCode::OK, ACK_BODY));
    }

    let symbol = signal.symbol().to_string();
    let result = ctx.dispatcher.dispatch(signal).await;
    info!(
        symbol = %symbol,
        delivered = result.delivered(),
        sinks = result.reports.len(),
        "Webhook signal dispatched"
    );

    Ok((StatusCode::OK, ACK_BODY))
}

/// `POST /commands/risk`: JSON options in, embed plus text rendering out.
async fn risk_command(
    State(ctx): State<Arc<RelayContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, RelayError> {
    ctx.guard.verify(header_secret(&headers)?)?;

    let options: RiskOptions = serde_json::from_slice(&body)
        .map_err(|e| RelayError::InvalidInput(format!("invalid risk options: {e}")))?;
    let message = handle_risk(&options, &ctx.brand)?;

    Ok(Json(serde_json::json!({
        "embed": message.to_embed(),
        "text": message.render_text(),
    })))
}
