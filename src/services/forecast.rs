// src/services/forecast.rs
use log::{error, info};
use thiserror::Error;

use super::arima::ArimaStrategy;
use super::prophet::ProphetStrategy;
use crate::models::{ForecastPoint, ForecastReport, ForecastResult, TimeSeries};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("forecast horizon must be a positive number of years, got {0}")]
    InvalidHorizon(usize),
    #[error("need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("series contains non-finite values")]
    InvalidData,
    #[error("model fitting did not converge: {0}")]
    Convergence(String),
    #[error("prediction failed: {0}")]
    Prediction(String),
}

/// Output of one strategy: `predictions` covers the requested future years,
/// `fitted` the observed ones.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyForecast {
    pub predictions: Vec<ForecastPoint>,
    pub fitted: Vec<ForecastPoint>,
}

pub trait ForecastStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Fits from scratch on every call; implementations must not keep state
    /// between calls or touch the input series.
    fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<StrategyForecast, ForecastError>;
}

/// Consecutive years following `last_year`.
pub fn future_years(last_year: i32, horizon: usize) -> Vec<i32> {
    (1..=horizon as i32).map(|step| last_year + step).collect()
}

pub struct ForecastEngine {
    arima: Box<dyn ForecastStrategy>,
    prophet: Box<dyn ForecastStrategy>,
}

impl Default for ForecastEngine {
    fn default() -> Self {
        ForecastEngine::new(Box::new(ArimaStrategy::default()), Box::new(ProphetStrategy::default()))
    }
}

impl ForecastEngine {
    pub fn new(arima: Box<dyn ForecastStrategy>, prophet: Box<dyn ForecastStrategy>) -> Self {
        ForecastEngine { arima, prophet }
    }

    /// Runs both strategies independently. Only an invalid horizon fails the
    /// whole call; strategy errors come back as `ForecastResult::Failure`.
    pub fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<ForecastReport, ForecastError> {
        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon(horizon));
        }
        info!("Forecasting {} years ahead from {} observations", horizon, series.len());

        Ok(ForecastReport {
            horizon,
            arima: run_isolated(self.arima.as_ref(), series, horizon),
            prophet: run_isolated(self.prophet.as_ref(), series, horizon),
        })
    }
}

fn run_isolated(strategy: &dyn ForecastStrategy, series: &TimeSeries, horizon: usize) -> ForecastResult {
    let name = strategy.name().to_string();
    let outcome = strategy.forecast(series, horizon).and_then(|forecast| {
        if forecast.predictions.len() != horizon {
            return Err(ForecastError::Prediction(format!(
                "expected {} predictions, got {}",
                horizon,
                forecast.predictions.len()
            )));
        }
        Ok(forecast)
    });

    match outcome {
        Ok(StrategyForecast { predictions, fitted }) => {
            info!("{} forecast ready ({} points)", name, predictions.len());
            ForecastResult::Success {
                strategy: name,
                predictions,
                fitted,
            }
        }
        Err(e) => {
            error!("{} forecast failed: {}", name, e);
            ForecastResult::Failure {
                strategy: name,
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl ForecastStrategy for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn forecast(&self, _series: &TimeSeries, _horizon: usize) -> Result<StrategyForecast, ForecastError> {
            Err(ForecastError::Convergence("injected".into()))
        }
    }

    struct Flat;

    impl ForecastStrategy for Flat {
        fn name(&self) -> &str {
            "flat"
        }

        fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<StrategyForecast, ForecastError> {
            let last = series.points().last().ok_or(ForecastError::InsufficientData { required: 1, actual: 0 })?;
            let predictions = future_years(last.year, horizon)
                .into_iter()
                .map(|year| ForecastPoint { year, value: last.value, lower: None, upper: None })
                .collect();
            Ok(StrategyForecast { predictions, fitted: Vec::new() })
        }
    }

    struct Short;

    impl ForecastStrategy for Short {
        fn name(&self) -> &str {
            "short"
        }

        fn forecast(&self, _series: &TimeSeries, _horizon: usize) -> Result<StrategyForecast, ForecastError> {
            Ok(StrategyForecast { predictions: Vec::new(), fitted: Vec::new() })
        }
    }

    fn series() -> TimeSeries {
        TimeSeries::from_pairs(&[(2017, 1.0), (2018, 2.0), (2019, 3.0)]).unwrap()
    }

    #[test]
    fn test_future_years() {
        assert_eq!(future_years(2019, 3), vec![2020, 2021, 2022]);
        assert!(future_years(2019, 0).is_empty());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let engine = ForecastEngine::new(Box::new(Flat), Box::new(Flat));
        assert_eq!(engine.forecast(&series(), 0), Err(ForecastError::InvalidHorizon(0)));
    }

    #[test]
    fn test_failure_is_isolated() {
        let engine = ForecastEngine::new(Box::new(Failing), Box::new(Flat));
        let report = engine.forecast(&series(), 2).unwrap();

        match &report.arima {
            ForecastResult::Failure { strategy, message } => {
                assert_eq!(strategy, "failing");
                assert!(message.contains("injected"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        let predictions = report.prophet.predictions().unwrap();
        assert_eq!(predictions.iter().map(|p| p.year).collect::<Vec<_>>(), vec![2020, 2021]);
    }

    #[test]
    fn test_wrong_length_is_failure() {
        let engine = ForecastEngine::new(Box::new(Short), Box::new(Flat));
        let report = engine.forecast(&series(), 4).unwrap();
        assert!(!report.arima.is_success());
        assert!(report.prophet.is_success());
    }
}
