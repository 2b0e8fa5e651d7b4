// src/handlers/stationarity.rs
use log::{error, info, warn};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::stationarity;
use crate::state::AppState;

pub async fn get_stationarity(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to run the ADF test");

    let series = state.cache.load().await.map_err(|e| {
        error!("Failed to load GDP series: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    match stationarity::analyze(&series) {
        Ok(result) => Ok(warp::reply::json(&result)),
        Err(e) => {
            warn!("ADF test could not run: {}", e);
            Err(warp::reject::custom(ApiError::unprocessable(e.to_string())))
        }
    }
}
