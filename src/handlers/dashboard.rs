// src/handlers/dashboard.rs
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::services::pipeline::{run_pipeline, PipelineRequest};
use crate::state::AppState;

/// Re-runs the whole pipeline for the current horizon and raw data toggle.
pub async fn get_dashboard(request: PipelineRequest, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling dashboard request: {:?}", request);

    let snapshot = run_pipeline(&state.cache, &state.engine, request)
        .await
        .map_err(|e| {
            error!("Dashboard pipeline failed: {}", e);
            warp::reject::custom(ApiError::from(e))
        })?;

    Ok(warp::reply::json(&snapshot))
}
