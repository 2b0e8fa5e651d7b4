// src/bin/gdp_report.rs
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::env;
use std::sync::Arc;

use gdp_dashboard::config::AppConfig;
use gdp_dashboard::services::cache::SeriesCache;
use gdp_dashboard::services::forecast::ForecastEngine;
use gdp_dashboard::services::pipeline::{run_pipeline, PipelineRequest, DEFAULT_HORIZON};
use gdp_dashboard::services::world_bank::WorldBankClient;

/// Runs the dashboard pipeline once and prints the snapshot as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let horizon = match env::var("HORIZON") {
        Ok(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("HORIZON must be an integer, got {:?}", raw))?,
        Err(_) => DEFAULT_HORIZON,
    };
    let show_raw = env::var("SHOW_RAW").map(|v| v == "1" || v == "true").unwrap_or(false);

    let config = AppConfig::from_env();
    let cache = SeriesCache::new(Arc::new(WorldBankClient::from_config(&config)?));
    let engine = ForecastEngine::default();

    info!("Building report with horizon {}", horizon);
    let snapshot = run_pipeline(&cache, &engine, PipelineRequest { horizon, show_raw }).await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
