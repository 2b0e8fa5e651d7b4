// src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One annual observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub year: i32,
    pub value: f64,
}

/// An `id`/`value` pair as the World Bank labels countries and indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesLabel {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("duplicate observation for year {0}")]
    DuplicateYear(i32),
    #[error("non-finite value for year {0}")]
    NonFinite(i32),
}

/// Annual series sorted by year with no duplicate years and no missing values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub country: SeriesLabel,
    pub indicator: SeriesLabel,
    pub last_updated: Option<NaiveDate>,
    pub fetched_at: DateTime<Utc>,
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn new(
        country: SeriesLabel,
        indicator: SeriesLabel,
        last_updated: Option<NaiveDate>,
        mut points: Vec<TimeSeriesPoint>,
    ) -> Result<Self, SeriesError> {
        if let Some(p) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(SeriesError::NonFinite(p.year));
        }
        points.sort_by_key(|p| p.year);
        if let Some(w) = points.windows(2).find(|w| w[0].year == w[1].year) {
            return Err(SeriesError::DuplicateYear(w[0].year));
        }

        Ok(Self {
            country,
            indicator,
            last_updated,
            fetched_at: Utc::now(),
            points,
        })
    }

    /// Unlabelled series, mostly for tests and offline runs.
    pub fn from_pairs(pairs: &[(i32, f64)]) -> Result<Self, SeriesError> {
        let points = pairs
            .iter()
            .map(|&(year, value)| TimeSeriesPoint { year, value })
            .collect();
        Self::new(SeriesLabel::default(), SeriesLabel::default(), None, points)
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.year).collect()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.points.first().map(|p| p.year)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.points.last().map(|p| p.year)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The last `n` observations, oldest first.
    pub fn tail(&self, n: usize) -> &[TimeSeriesPoint] {
        let start = self.points.len().saturating_sub(n);
        &self.points[start..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub n_obs: usize,
    pub critical_values: CriticalValues,
    pub is_stationary: bool,
}

/// Stationarity test result as the dashboard renders it: either the numbers
/// or the reason the test could not run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StationarityOutcome {
    Ok(StationarityResult),
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub year: i32,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastResult {
    Success {
        strategy: String,
        predictions: Vec<ForecastPoint>,
        fitted: Vec<ForecastPoint>,
    },
    Failure {
        strategy: String,
        message: String,
    },
}

impl ForecastResult {
    pub fn strategy(&self) -> &str {
        match self {
            ForecastResult::Success { strategy, .. } | ForecastResult::Failure { strategy, .. } => {
                strategy
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ForecastResult::Success { .. })
    }

    pub fn predictions(&self) -> Option<&[ForecastPoint]> {
        match self {
            ForecastResult::Success { predictions, .. } => Some(predictions),
            ForecastResult::Failure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub horizon: usize,
    pub arima: ForecastResult,
    pub prophet: ForecastResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub country: SeriesLabel,
    pub indicator: SeriesLabel,
    pub last_updated: Option<NaiveDate>,
    pub fetched_at: DateTime<Utc>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub observations: usize,
    pub points: Vec<TimeSeriesPoint>,
}

impl From<&TimeSeries> for SeriesSummary {
    fn from(series: &TimeSeries) -> Self {
        SeriesSummary {
            country: series.country.clone(),
            indicator: series.indicator.clone(),
            last_updated: series.last_updated,
            fetched_at: series.fetched_at,
            first_year: series.first_year(),
            last_year: series.last_year(),
            observations: series.len(),
            points: series.points().to_vec(),
        }
    }
}

/// Everything one dashboard render needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub series: SeriesSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<TimeSeriesPoint>>,
    pub stationarity: StationarityOutcome,
    pub forecasts: ForecastReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_sorted_on_construction() {
        let series = TimeSeries::from_pairs(&[(2012, 3.0), (2010, 1.0), (2011, 2.0)]).unwrap();
        assert_eq!(series.years(), vec![2010, 2011, 2012]);
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_year(), Some(2012));
    }

    #[test]
    fn test_duplicate_years_rejected() {
        let err = TimeSeries::from_pairs(&[(2010, 1.0), (2010, 2.0)]).unwrap_err();
        assert_eq!(err, SeriesError::DuplicateYear(2010));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = TimeSeries::from_pairs(&[(2010, f64::NAN)]).unwrap_err();
        assert_eq!(err, SeriesError::NonFinite(2010));
    }

    #[test]
    fn test_tail() {
        let series = TimeSeries::from_pairs(&[(2010, 1.0), (2011, 2.0), (2012, 3.0)]).unwrap();
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(2)[0].year, 2011);
        assert_eq!(series.tail(10).len(), 3);
    }

    #[test]
    fn test_forecast_result_serializes_with_status_tag() {
        let failure = ForecastResult::Failure {
            strategy: "arima".to_string(),
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["strategy"], "arima");
        assert!(failure.predictions().is_none());
    }
}
