// src/handlers/forecast.rs
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::pipeline::{validate_horizon, DEFAULT_HORIZON};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    #[serde(default = "default_horizon")]
    pub horizon: i64,
}

fn default_horizon() -> i64 {
    DEFAULT_HORIZON
}

pub async fn get_forecast(query: ForecastQuery, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to forecast {} years", query.horizon);

    let horizon = validate_horizon(query.horizon).map_err(|e| warp::reject::custom(ApiError::from(e)))?;

    let series = state.cache.load().await.map_err(|e| {
        error!("Failed to load GDP series: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    let report = state.engine.forecast(&series, horizon).map_err(|e| {
        error!("Forecast request failed: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Ok(warp::reply::json(&report))
}
