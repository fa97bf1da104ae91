use std::sync::Arc;

use tracing::info;

use courier_relay::broadcast::BroadcastDispatcher;
use courier_relay::engine::RelayEngine;
use courier_relay::transport::Transport;
use courier_server::config::Config;
use courier_server::router::Router;
use courier_server::telegram::TelegramClient;
use courier_store::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let registry = Arc::new(Registry::open(&config.store_path));
    let client = Arc::new(TelegramClient::new(&config.bot_token));

    // Fail fast on a bad token before entering the poll loop.
    let me = client.get_me().await?;
    info!(
        "Bot @{} ({}) starting, operator id {}",
        me.username.as_deref().unwrap_or("unknown"),
        me.id,
        config.operator_id
    );

    let transport: Arc<dyn Transport> = client.clone();
    let engine = RelayEngine::new(registry.clone(), transport.clone(), config.operator_id);
    let dispatcher = BroadcastDispatcher::new(registry, transport);

    let router = Router::new(client, engine, dispatcher);
    router.run(config.poll_timeout_secs).await;

    Ok(())
}
