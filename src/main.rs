use dotenvy::dotenv;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pitchmeet::config::AppConfig;
use pitchmeet::notifications::LogEmitter;
use pitchmeet::shared::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pitchmeet=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env();
    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, Arc::new(LogEmitter)));
    let app = pitchmeet::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("pitchmeet listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
