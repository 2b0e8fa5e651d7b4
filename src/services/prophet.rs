// src/services/prophet.rs
//! Prophet-style additive model: `y(t) = g(t) + s(t) + ε`.
//!
//! `g` is a piecewise-linear trend whose rate may change at changepoints spread
//! over the first part of the history, `s` an optional Fourier seasonality.
//! Rate changes carry a Laplace prior, base rate and offset a wide normal one;
//! the MAP estimate is found by iteratively reweighted ridge regression on
//! max-abs scaled `y` and `t` scaled to [0, 1].
use log::debug;
use statrs::function::erf::erf_inv;
use std::f64::consts::PI;

use super::forecast::{future_years, ForecastError, ForecastStrategy, StrategyForecast};
use super::linalg::{normal_equations, ols, solve};
use crate::models::{ForecastPoint, TimeSeries};

pub const MIN_OBSERVATIONS: usize = 2;
const IRLS_ITERATIONS: usize = 50;
const IRLS_TOLERANCE: f64 = 1e-10;
const MIN_SIGMA2: f64 = 1e-10;
const MIN_ABS_DELTA: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub period_years: f64,
    pub fourier_order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProphetConfig {
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub base_prior_scale: f64,
    /// Off by default: annual observations carry no within-year cycle.
    pub seasonality: Option<Seasonality>,
    pub seasonality_prior_scale: f64,
    pub interval_width: f64,
}

impl Default for ProphetConfig {
    fn default() -> Self {
        ProphetConfig {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            base_prior_scale: 5.0,
            seasonality: None,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProphetStrategy {
    pub config: ProphetConfig,
}

impl ProphetStrategy {
    pub fn new(config: ProphetConfig) -> Self {
        ProphetStrategy { config }
    }
}

impl ForecastStrategy for ProphetStrategy {
    fn name(&self) -> &str {
        "prophet"
    }

    fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<StrategyForecast, ForecastError> {
        let years = series.years();
        let fit = ProphetFit::fit(&years, &series.values(), &self.config)?;
        let last_year = *years.last().ok_or(ForecastError::InsufficientData {
            required: MIN_OBSERVATIONS,
            actual: 0,
        })?;

        let fitted = years.iter().map(|&year| fit.predict(year)).collect();
        let predictions = future_years(last_year, horizon)
            .into_iter()
            .map(|year| fit.predict(year))
            .collect();

        Ok(StrategyForecast { predictions, fitted })
    }
}

#[derive(Debug, Clone)]
pub struct ProphetFit {
    config: ProphetConfig,
    t0: f64,
    t_span: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    beta: Vec<f64>,
    sigma2: f64,
    z: f64,
}

impl ProphetFit {
    pub fn fit(years: &[i32], values: &[f64], config: &ProphetConfig) -> Result<Self, ForecastError> {
        let n = values.len();
        if n < MIN_OBSERVATIONS {
            return Err(ForecastError::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: n,
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidData);
        }

        let t0 = years[0] as f64;
        let t_span = (years[n - 1] - years[0]) as f64;
        if t_span <= 0.0 {
            return Err(ForecastError::Prediction("history covers a single year".into()));
        }
        let y_max = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y_scale = if y_max > 0.0 { y_max } else { 1.0 };

        let t: Vec<f64> = years.iter().map(|&y| (y as f64 - t0) / t_span).collect();
        let y: Vec<f64> = values.iter().map(|v| v / y_scale).collect();
        let changepoints = changepoint_times(&t, config.n_changepoints, config.changepoint_range);

        let mut fit = ProphetFit {
            config: config.clone(),
            t0,
            t_span,
            y_scale,
            changepoints,
            beta: Vec::new(),
            sigma2: MIN_SIGMA2,
            z: normal_quantile(0.5 + config.interval_width / 2.0),
        };

        let x: Vec<Vec<f64>> = years.iter().zip(&t).map(|(&year, &ts)| fit.features(year, ts)).collect();
        fit.sigma2 = initial_sigma2(&t, &y);
        fit.beta = fit.map_estimate(&x, &y)?;
        debug!(
            "Prophet-style fit: {} changepoints, sigma={:.4e}",
            fit.changepoints.len(),
            fit.sigma2.sqrt() * fit.y_scale
        );
        Ok(fit)
    }

    /// `[offset, rate, rate changes.., seasonal terms..]`
    fn features(&self, year: i32, t: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(2 + self.changepoints.len());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&s| if t >= s { t - s } else { 0.0 }));
        if let Some(season) = self.config.seasonality {
            for k in 1..=season.fourier_order {
                let angle = 2.0 * PI * k as f64 * year as f64 / season.period_years;
                row.push(angle.cos());
                row.push(angle.sin());
            }
        }
        row
    }

    fn map_estimate(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, ForecastError> {
        let (xtx, xty) = normal_equations(x, y);
        let k = xty.len();
        let n_cp = self.changepoints.len();
        let base_var = self.config.base_prior_scale.powi(2);
        let season_var = self.config.seasonality_prior_scale.powi(2);
        let tau = self.config.changepoint_prior_scale;

        // first pass treats the Laplace prior as a normal with the same variance
        let mut delta_weights = vec![1.0 / (2.0 * tau * tau); n_cp];
        let mut beta = vec![0.0; k];

        for iteration in 0..IRLS_ITERATIONS {
            let mut a = xtx.clone();
            for (j, row) in a.iter_mut().enumerate() {
                row[j] += self.sigma2
                    * match j {
                        0 | 1 => 1.0 / base_var,
                        j if j < 2 + n_cp => delta_weights[j - 2],
                        _ => 1.0 / season_var,
                    };
            }
            let next = solve(a, xty.clone())
                .ok_or_else(|| ForecastError::Convergence("trend system is singular".into()))?;
            if next.iter().any(|b| !b.is_finite()) {
                return Err(ForecastError::Convergence("trend coefficients are not finite".into()));
            }

            let rss: f64 = x
                .iter()
                .zip(y)
                .map(|(row, &yi)| (yi - dot(row, &next)).powi(2))
                .sum();
            self.sigma2 = (rss / y.len() as f64).max(MIN_SIGMA2);

            let change = next.iter().zip(&beta).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
            beta = next;
            for (w, delta) in delta_weights.iter_mut().zip(&beta[2..2 + n_cp]) {
                *w = 1.0 / (tau * delta.abs().max(MIN_ABS_DELTA));
            }
            if change < IRLS_TOLERANCE {
                debug!("IRLS converged after {} iterations", iteration + 1);
                break;
            }
        }
        Ok(beta)
    }

    fn scaled_time(&self, year: i32) -> f64 {
        (year as f64 - self.t0) / self.t_span
    }

    /// Mean and interval for `year`, on the original scale. Beyond the history
    /// the interval also covers rate changes that may still happen.
    pub fn predict(&self, year: i32) -> ForecastPoint {
        let t = self.scaled_time(year);
        let yhat = dot(&self.features(year, t), &self.beta);

        let mut variance = self.sigma2;
        if t > 1.0 && !self.changepoints.is_empty() {
            let deltas = &self.beta[2..2 + self.changepoints.len()];
            let lambda = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64 + 1e-8;
            let rate = self.changepoints.len() as f64;
            variance += 2.0 * rate * lambda * lambda * (t - 1.0).powi(3) / 3.0;
        }
        let half_width = self.z * variance.sqrt();

        ForecastPoint {
            year,
            value: yhat * self.y_scale,
            lower: Some((yhat - half_width) * self.y_scale),
            upper: Some((yhat + half_width) * self.y_scale),
        }
    }
}

/// Changepoints at evenly spaced observations within the first
/// `range` fraction of the history, excluding the first observation.
pub fn changepoint_times(t: &[f64], requested: usize, range: f64) -> Vec<f64> {
    let hist_size = (t.len() as f64 * range).floor() as usize;
    let n_cp = requested.min(hist_size.saturating_sub(1));
    if n_cp == 0 {
        return Vec::new();
    }
    let last = (hist_size - 1) as f64;
    (1..=n_cp)
        .map(|i| {
            let idx = (last * i as f64 / n_cp as f64).round() as usize;
            t[idx]
        })
        .collect()
}

fn initial_sigma2(t: &[f64], y: &[f64]) -> f64 {
    let x: Vec<Vec<f64>> = t.iter().map(|&ts| vec![1.0, ts]).collect();
    match ols(&x, y) {
        Some(fit) => (fit.rss / y.len() as f64).max(MIN_SIGMA2),
        None => MIN_SIGMA2,
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normal_quantile(p: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_from(values: &[f64], start: i32) -> TimeSeries {
        let pairs: Vec<(i32, f64)> = values.iter().enumerate().map(|(i, &v)| (start + i as i32, v)).collect();
        TimeSeries::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn test_linear_series_extrapolates_linearly() {
        let values: Vec<f64> = (0..20).map(|i| 50.0 + 3.0 * i as f64).collect();
        let forecast = ProphetStrategy::default().forecast(&series_from(&values, 2000), 3).unwrap();

        for (i, p) in forecast.predictions.iter().enumerate() {
            let expected = 50.0 + 3.0 * (20 + i) as f64;
            assert_eq!(p.year, 2020 + i as i32);
            assert!((p.value - expected).abs() / expected < 1e-3, "{} vs {}", p.value, expected);
        }
    }

    #[test]
    fn test_predictions_and_fitted_cover_extended_range() {
        let values = [100.0, 105.0, 108.0, 110.0, 115.0, 120.0, 118.0, 122.0, 125.0, 130.0];
        let forecast = ProphetStrategy::default().forecast(&series_from(&values, 2010), 3).unwrap();
        assert_eq!(forecast.fitted.len(), 10);
        assert_eq!(forecast.fitted[0].year, 2010);
        let years: Vec<i32> = forecast.predictions.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2020, 2021, 2022]);
        for p in forecast.fitted.iter().chain(&forecast.predictions) {
            assert!(p.lower.unwrap() < p.value && p.value < p.upper.unwrap());
        }
    }

    #[test]
    fn test_future_interval_widens() {
        let values = [100.0, 105.0, 108.0, 110.0, 115.0, 120.0, 118.0, 122.0, 125.0, 130.0];
        let forecast = ProphetStrategy::default().forecast(&series_from(&values, 2010), 5).unwrap();
        let widths: Vec<f64> = forecast.predictions.iter().map(|p| p.upper.unwrap() - p.lower.unwrap()).collect();
        for w in widths.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_two_points_are_enough() {
        let forecast = ProphetStrategy::default().forecast(&series_from(&[10.0, 12.0], 2018), 2).unwrap();
        assert_eq!(forecast.predictions.len(), 2);
        assert!((forecast.predictions[0].value - 14.0).abs() < 0.1);
    }

    #[test]
    fn test_single_point_is_insufficient() {
        let err = ProphetStrategy::default().forecast(&series_from(&[10.0], 2018), 2).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { required: 2, actual: 1 });
    }

    #[test]
    fn test_changepoint_placement() {
        let t: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        let cps = changepoint_times(&t, 25, 0.8);
        assert_eq!(cps.len(), 7);
        assert_eq!(cps[0], t[1]);
        assert_eq!(*cps.last().unwrap(), t[7]);
        assert!(changepoint_times(&t[..2], 25, 0.8).is_empty());
    }

    #[test]
    fn test_seasonality_is_captured() {
        let values: Vec<f64> = (0..40)
            .map(|i| 20.0 + 2.0 * i as f64 + 5.0 * (2.0 * PI * i as f64 / 4.0).sin())
            .collect();
        let config = ProphetConfig {
            seasonality: Some(Seasonality { period_years: 4.0, fourier_order: 1 }),
            ..ProphetConfig::default()
        };
        let forecast = ProphetStrategy::new(config).forecast(&series_from(&values, 2000), 4).unwrap();
        for (p, &actual) in forecast.fitted.iter().zip(&values) {
            assert!((p.value - actual).abs() < 0.5, "{} vs {}", p.value, actual);
        }
    }
}
