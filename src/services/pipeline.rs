// src/services/pipeline.rs
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use super::cache::SeriesCache;
use super::forecast::{ForecastEngine, ForecastError};
use super::stationarity;
use super::world_bank::LoadError;
use crate::models::{DashboardSnapshot, SeriesSummary, StationarityOutcome};

pub const MIN_HORIZON: i64 = 1;
pub const MAX_HORIZON: i64 = 20;
pub const DEFAULT_HORIZON: i64 = 5;
/// Rows shown when the raw data toggle is on.
pub const RAW_TAIL_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PipelineRequest {
    #[serde(default = "default_horizon")]
    pub horizon: i64,
    #[serde(default)]
    pub show_raw: bool,
}

fn default_horizon() -> i64 {
    DEFAULT_HORIZON
}

impl Default for PipelineRequest {
    fn default() -> Self {
        PipelineRequest {
            horizon: DEFAULT_HORIZON,
            show_raw: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("horizon must be between {min} and {max}, got {got}")]
    InvalidHorizon { min: i64, max: i64, got: i64 },
    #[error("failed to load GDP series: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

pub fn validate_horizon(horizon: i64) -> Result<usize, PipelineError> {
    if !(MIN_HORIZON..=MAX_HORIZON).contains(&horizon) {
        return Err(PipelineError::InvalidHorizon {
            min: MIN_HORIZON,
            max: MAX_HORIZON,
            got: horizon,
        });
    }
    Ok(horizon as usize)
}

/// One full dashboard pass: load (memoised), test for stationarity, forecast.
/// A load failure stops here; analysis and forecast failures are carried in
/// the snapshot.
pub async fn run_pipeline(
    cache: &SeriesCache,
    engine: &ForecastEngine,
    request: PipelineRequest,
) -> Result<DashboardSnapshot, PipelineError> {
    let horizon = validate_horizon(request.horizon)?;
    let series = cache.load().await?;
    info!("Running pipeline: horizon={} show_raw={}", horizon, request.show_raw);

    let stationarity = match stationarity::analyze(&series) {
        Ok(result) => StationarityOutcome::Ok(result),
        Err(e) => {
            warn!("Stationarity test unavailable: {}", e);
            StationarityOutcome::Error { message: e.to_string() }
        }
    };

    let forecasts = engine.forecast(&series, horizon)?;
    let raw_data = request.show_raw.then(|| series.tail(RAW_TAIL_ROWS).to_vec());

    Ok(DashboardSnapshot {
        series: SeriesSummary::from(series.as_ref()),
        raw_data,
        stationarity,
        forecasts,
    })
}
