//! Preetos Order Intake - chat order parsing and ledger service

use anyhow::Result;
use preetos_order_intake::{api, Config};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let state = api::AppState::from_config(&config).await?;
    tracing::info!(
        oracle = config.oracle_settings().is_some(),
        sheets = config.sheets_settings().is_some(),
        nats = state.events.is_connected(),
        "order intake configured"
    );

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("🚀 Preetos Order Intake listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
