// src/state.rs
use std::sync::Arc;

use crate::services::cache::SeriesCache;
use crate::services::forecast::ForecastEngine;
use crate::services::world_bank::SeriesSource;

/// Shared by every request handler.
pub struct AppState {
    pub cache: SeriesCache,
    pub engine: ForecastEngine,
}

impl AppState {
    pub fn new(source: Arc<dyn SeriesSource>, engine: ForecastEngine) -> Self {
        AppState {
            cache: SeriesCache::new(source),
            engine,
        }
    }
}
