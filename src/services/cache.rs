// src/services/cache.rs
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::world_bank::{LoadError, SeriesSource};
use crate::models::TimeSeries;

/// Process-lifetime memo of the one parameterless fetch. Only successful loads
/// are kept; after a failure the next call goes back to the source.
pub struct SeriesCache {
    source: Arc<dyn SeriesSource>,
    series: OnceCell<Arc<TimeSeries>>,
}

impl SeriesCache {
    pub fn new(source: Arc<dyn SeriesSource>) -> Self {
        SeriesCache {
            source,
            series: OnceCell::new(),
        }
    }

    pub async fn load(&self) -> Result<Arc<TimeSeries>, LoadError> {
        if let Some(series) = self.series.get() {
            debug!("Serving GDP series from cache");
            return Ok(series.clone());
        }

        let series = self
            .series
            .get_or_try_init(|| async {
                info!("Cache empty, fetching GDP series");
                self.source.fetch().await.map(Arc::new)
            })
            .await?;
        Ok(series.clone())
    }

    pub fn cached(&self) -> Option<Arc<TimeSeries>> {
        self.series.get().cloned()
    }
}
