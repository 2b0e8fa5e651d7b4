// src/handlers/series.rs
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;
use warp::reply::{Json, Response};
use warp::{Rejection, Reply};

use super::error::ApiError;
use crate::models::{SeriesSummary, TimeSeriesPoint};
use crate::services::pipeline::RAW_TAIL_ROWS;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct RawQuery {
    #[serde(default)]
    pub format: RawFormat,
    pub rows: Option<usize>,
}

pub async fn get_series(state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to get GDP series");

    let series = state.cache.load().await.map_err(|e| {
        error!("Failed to load GDP series: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;

    Ok(warp::reply::json(&SeriesSummary::from(series.as_ref())))
}

/// Last rows of the raw table, as JSON or CSV.
pub async fn get_raw_data(query: RawQuery, state: Arc<AppState>) -> Result<Response, Rejection> {
    info!("Handling request to get raw GDP data ({:?})", query.format);

    let series = state.cache.load().await.map_err(|e| {
        error!("Failed to load GDP series: {}", e);
        warp::reject::custom(ApiError::from(e))
    })?;
    let rows = series.tail(query.rows.unwrap_or(RAW_TAIL_ROWS));

    match query.format {
        RawFormat::Json => Ok(warp::reply::json(&rows).into_response()),
        RawFormat::Csv => {
            let body = to_csv(rows).map_err(|e| {
                error!("Failed to write CSV: {}", e);
                warp::reject::custom(ApiError::internal(e.to_string()))
            })?;
            Ok(warp::reply::with_header(body, "content-type", "text/csv; charset=utf-8").into_response())
        }
    }
}

pub fn to_csv(rows: &[TimeSeriesPoint]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    let bytes = wtr.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_csv() {
        let rows = [
            TimeSeriesPoint { year: 2020, value: 1.5 },
            TimeSeriesPoint { year: 2021, value: 2.0 },
        ];
        assert_eq!(to_csv(&rows).unwrap(), "year,value\n2020,1.5\n2021,2.0\n");
    }
}
