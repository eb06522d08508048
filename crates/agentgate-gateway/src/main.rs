use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use agentgate_gateway::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentgate_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > GATEWAY_CONFIG env > ~/.agentgate/gateway.toml
    let config = agentgate_core::GatewayConfig::load(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        agentgate_core::GatewayConfig::default()
    });

    std::fs::create_dir_all(&config.data_dir)?;
    let db_path = format!("{}/identities.db", config.data_dir);
    let identities = agentgate_identity::IdentityStore::open(&db_path)?;

    let bind = config.bind.clone();
    let port = config.port;
    let state = Arc::new(app::AppState::new(config, identities));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("agentgate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
