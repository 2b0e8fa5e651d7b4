use dotenv::dotenv;
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use gdp_dashboard::config::AppConfig;
use gdp_dashboard::routes;
use gdp_dashboard::services::forecast::ForecastEngine;
use gdp_dashboard::services::world_bank::WorldBankClient;
use gdp_dashboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env();
    info!("Using PORT: {}, World Bank API: {}", config.port, config.world_bank_base_url);

    let source = WorldBankClient::from_config(&config)?;
    let state = Arc::new(AppState::new(Arc::new(source), ForecastEngine::default()));

    // Pay for the fetch once up front; a failure here is retried on the first request.
    match state.cache.load().await {
        Ok(series) => info!("Warmed cache with {} observations", series.len()),
        Err(e) => warn!("Initial GDP fetch failed, will retry on request: {}", e),
    }

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET"]);

    let api = routes::routes(state).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}
