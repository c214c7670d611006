use std::sync::Arc;

use signal_relay::adapters::{relay_routes, run_chat_channel};
use signal_relay::channels::{Channel, TelegramChannel};
use signal_relay::config::{RelayConfig, StoreConfig};
use signal_relay::context::RelayContext;
use signal_relay::notify::discord::RESOLVE_RETRY_INTERVAL;
use signal_relay::notify::{
    ChannelHandle, DiscordClient, NotificationSink, NotificationTransport, spawn_channel_resolution,
};
use signal_relay::pipeline::{Dispatcher, SecretGuard, SignalSink};
use signal_relay::store::{LibSqlStore, PersistenceSink, SignalStore, SupabaseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("📡 Signal Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Risk API: http://0.0.0.0:{}/commands/risk", config.port);
    eprintln!("   Alert channel: {}", config.discord.channel_id);

    // ── Persistence ─────────────────────────────────────────────────────
    let store: Arc<dyn SignalStore> = match &config.store {
        StoreConfig::Supabase { url, key } => {
            eprintln!("   Store: supabase ({url})");
            Arc::new(SupabaseStore::new(url, key.clone()))
        }
        StoreConfig::Local { path } => {
            eprintln!("   Store: libsql ({})", path.display());
            Arc::new(LibSqlStore::new_local(path).await?)
        }
    };

    // ── Notification ────────────────────────────────────────────────────
    let discord: Arc<dyn NotificationTransport> = Arc::new(DiscordClient::with_api_base(
        config.discord.token.clone(),
        &config.discord.api_base,
    ));
    let channel = ChannelHandle::new();
    let _resolver = spawn_channel_resolution(
        Arc::clone(&discord),
        config.discord.channel_id.clone(),
        channel.clone(),
        RESOLVE_RETRY_INTERVAL,
    );

    // ── Pipeline ────────────────────────────────────────────────────────
    let sinks: Vec<Arc<dyn SignalSink>> = vec![
        Arc::new(NotificationSink::new(discord, channel.clone(), &config.brand)),
        Arc::new(PersistenceSink::new(store)),
    ];
    let dispatcher = Dispatcher::new(sinks).with_timeout(config.sink_timeout);
    let ctx = Arc::new(RelayContext::new(
        dispatcher,
        SecretGuard::new(config.webhook_secret.clone()),
        channel,
        config.brand.clone(),
    ));

    // ── Chat channel ────────────────────────────────────────────────────
    match &config.telegram {
        Some(telegram) => {
            eprintln!(
                "   Telegram: enabled (allowed: {})",
                if telegram.allowed_users.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    telegram.allowed_users.join(", ")
                }
            );
            let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(
                telegram.token.clone(),
                telegram.allowed_users.clone(),
            ));
            if let Err(e) = channel.health_check().await {
                tracing::warn!(error = %e, "Telegram health check failed");
            }
            let chat_ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                if let Err(e) = run_chat_channel(channel, chat_ctx).await {
                    tracing::error!(error = %e, "Telegram channel stopped");
                }
            });
        }
        None => eprintln!("   Telegram: disabled"),
    }
    eprintln!();

    // ── HTTP ────────────────────────────────────────────────────────────
    let app = relay_routes(ctx);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Signal relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
