// src/services/arima.rs
//! ARIMA(1,1,1) on annual levels.
//!
//! The differenced series follows `w_t = φ·w_{t-1} + e_t + θ·e_{t-1}` with no
//! constant. `φ` and `θ` minimise the conditional sum of squares (`e_0 = 0`),
//! searched with Nelder-Mead over `tanh`-mapped coordinates so both stay inside
//! (-1, 1).
use argmin::core::{CostFunction, Error as ArgminError, Executor, State};
use argmin::solver::neldermead::NelderMead;
use log::debug;
use statrs::function::erf::erf_inv;

use super::forecast::{future_years, ForecastError, ForecastStrategy, StrategyForecast};
use crate::models::{ForecastPoint, TimeSeries};

pub const ORDER: (usize, usize, usize) = (1, 1, 1);
/// Four differences leave three CSS terms for two coefficients.
pub const MIN_OBSERVATIONS: usize = 5;
pub const INTERVAL_LEVEL: f64 = 0.95;
const MAX_ITERS: u64 = 500;

#[derive(Debug, Clone, Copy)]
pub struct ArimaStrategy {
    pub max_iters: u64,
    pub interval_level: f64,
}

impl Default for ArimaStrategy {
    fn default() -> Self {
        ArimaStrategy {
            max_iters: MAX_ITERS,
            interval_level: INTERVAL_LEVEL,
        }
    }
}

impl ForecastStrategy for ArimaStrategy {
    fn name(&self) -> &str {
        "arima"
    }

    fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<StrategyForecast, ForecastError> {
        let values = series.values();
        let years = series.years();
        let fit = ArimaFit::fit(&values, self.max_iters)?;
        let last_year = *years.last().ok_or(ForecastError::InsufficientData {
            required: MIN_OBSERVATIONS,
            actual: 0,
        })?;

        let z = normal_quantile(0.5 + self.interval_level / 2.0);
        let predictions = future_years(last_year, horizon)
            .into_iter()
            .zip(fit.forecast(horizon))
            .map(|(year, (mean, se))| ForecastPoint {
                year,
                value: mean,
                lower: Some(mean - z * se),
                upper: Some(mean + z * se),
            })
            .collect();

        // one-step fitted values start at the third observation
        let fitted = years[2..]
            .iter()
            .zip(fit.fitted())
            .map(|(&year, value)| ForecastPoint {
                year,
                value,
                lower: None,
                upper: None,
            })
            .collect();

        Ok(StrategyForecast { predictions, fitted })
    }
}

/// Estimated ARIMA(1,1,1).
#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub phi: f64,
    pub theta: f64,
    pub sigma2: f64,
    levels: Vec<f64>,
    diffs: Vec<f64>,
    residuals: Vec<f64>,
}

impl ArimaFit {
    pub fn fit(values: &[f64], max_iters: u64) -> Result<Self, ForecastError> {
        if values.len() < MIN_OBSERVATIONS {
            return Err(ForecastError::InsufficientData {
                required: MIN_OBSERVATIONS,
                actual: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidData);
        }

        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let scale = diffs.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));

        let (phi, theta) = if scale == 0.0 {
            (0.0, 0.0)
        } else {
            let scaled: Vec<f64> = diffs.iter().map(|d| d / scale).collect();
            minimise_css(scaled, max_iters)?
        };

        let residuals = css_residuals(&diffs, phi, theta);
        let terms = residuals.len() - 1;
        let sigma2 = residuals[1..].iter().map(|e| e * e).sum::<f64>() / terms as f64;
        if !sigma2.is_finite() {
            return Err(ForecastError::Convergence("residual variance is not finite".into()));
        }
        debug!("ARIMA(1,1,1) fit: phi={:.4} theta={:.4} sigma2={:.4e}", phi, theta, sigma2);

        Ok(ArimaFit {
            phi,
            theta,
            sigma2,
            levels: values.to_vec(),
            diffs,
            residuals,
        })
    }

    /// Point forecasts with their standard errors, `steps` years ahead.
    pub fn forecast(&self, steps: usize) -> Vec<(f64, f64)> {
        let last_diff = *self.diffs.last().unwrap_or(&0.0);
        let last_resid = *self.residuals.last().unwrap_or(&0.0);
        let mut level = *self.levels.last().unwrap_or(&0.0);

        // psi weights of the ARMA part, accumulated for the integration
        let mut psi = 1.0;
        let mut cumulative_psi = 0.0;
        let mut variance = 0.0;

        let mut diff = last_diff;
        let mut out = Vec::with_capacity(steps);
        for step in 0..steps {
            diff = if step == 0 {
                self.phi * last_diff + self.theta * last_resid
            } else {
                self.phi * diff
            };
            level += diff;

            if step == 1 {
                psi = self.phi + self.theta;
            } else if step > 1 {
                psi *= self.phi;
            }
            cumulative_psi += psi;
            variance += if step == 0 { self.sigma2 } else { self.sigma2 * cumulative_psi * cumulative_psi };

            out.push((level, variance.sqrt()));
        }
        out
    }

    /// One-step in-sample predictions for observations `2..n`.
    pub fn fitted(&self) -> Vec<f64> {
        (1..self.diffs.len())
            .map(|t| self.levels[t] + self.diffs[t] - self.residuals[t])
            .collect()
    }
}

fn css_residuals(diffs: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut e = vec![0.0; diffs.len()];
    for t in 1..diffs.len() {
        e[t] = diffs[t] - phi * diffs[t - 1] - theta * e[t - 1];
    }
    e
}

struct ConditionalSumOfSquares {
    diffs: Vec<f64>,
}

impl CostFunction for ConditionalSumOfSquares {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        let (phi, theta) = coefficients(param);
        Ok(css_residuals(&self.diffs, phi, theta)[1..].iter().map(|e| e * e).sum())
    }
}

fn coefficients(param: &[f64]) -> (f64, f64) {
    (param[0].tanh(), param[1].tanh())
}

fn minimise_css(diffs: Vec<f64>, max_iters: u64) -> Result<(f64, f64), ForecastError> {
    let start = lag1_autocorrelation(&diffs).clamp(-0.9, 0.9).atanh();
    let simplex = vec![vec![start, 0.0], vec![start + 0.5, 0.0], vec![start, 0.5]];

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(1e-10)
        .map_err(|e| ForecastError::Convergence(e.to_string()))?;
    let result = Executor::new(ConditionalSumOfSquares { diffs }, solver)
        .configure(|state| state.max_iters(max_iters))
        .run()
        .map_err(|e| ForecastError::Convergence(e.to_string()))?;

    let state = result.state();
    if !state.get_best_cost().is_finite() {
        return Err(ForecastError::Convergence("sum of squares is not finite".into()));
    }
    let best = state
        .get_best_param()
        .ok_or_else(|| ForecastError::Convergence("optimizer returned no parameters".into()))?;
    debug!("CSS minimised after {} iterations", state.get_iter());
    Ok(coefficients(best))
}

fn lag1_autocorrelation(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
    if var < 1e-12 {
        return 0.0;
    }
    let cov: f64 = data.windows(2).map(|w| (w[0] - mean) * (w[1] - mean)).sum();
    cov / var
}

fn normal_quantile(p: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gdp_like() -> TimeSeries {
        let values = [100.0, 105.0, 108.0, 110.0, 115.0, 120.0, 118.0, 122.0, 125.0, 130.0];
        let pairs: Vec<(i32, f64)> = values.iter().enumerate().map(|(i, &v)| (2010 + i as i32, v)).collect();
        TimeSeries::from_pairs(&pairs).unwrap()
    }

    #[test]
    fn test_forecast_years_and_length() {
        let forecast = ArimaStrategy::default().forecast(&gdp_like(), 3).unwrap();
        let years: Vec<i32> = forecast.predictions.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2020, 2021, 2022]);
        for p in &forecast.predictions {
            assert!(p.value.is_finite());
            assert!(p.lower.unwrap() <= p.value && p.value <= p.upper.unwrap());
        }
        assert_eq!(forecast.fitted.len(), 8);
        assert_eq!(forecast.fitted[0].year, 2012);
    }

    #[test]
    fn test_coefficients_inside_unit_interval() {
        let values: Vec<f64> = gdp_like().values();
        let fit = ArimaFit::fit(&values, MAX_ITERS).unwrap();
        assert!(fit.phi.abs() < 1.0);
        assert!(fit.theta.abs() < 1.0);
        assert!(fit.sigma2 > 0.0);
    }

    #[test]
    fn test_intervals_widen_with_horizon() {
        let values: Vec<f64> = gdp_like().values();
        let fit = ArimaFit::fit(&values, MAX_ITERS).unwrap();
        let out = fit.forecast(5);
        for w in out.windows(2) {
            assert!(w[1].1 >= w[0].1);
        }
    }

    #[test]
    fn test_flat_series_forecasts_flat() {
        let values = vec![10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        let fit = ArimaFit::fit(&values, MAX_ITERS).unwrap();
        let out = fit.forecast(2);
        assert_eq!(out[0].0, 10.0);
        assert_eq!(out[1].0, 10.0);
    }

    #[test]
    fn test_too_short() {
        let series = TimeSeries::from_pairs(&[(2018, 1.0), (2019, 2.0), (2020, 3.0)]).unwrap();
        assert_eq!(
            ArimaStrategy::default().forecast(&series, 2),
            Err(ForecastError::InsufficientData { required: MIN_OBSERVATIONS, actual: 3 })
        );
    }

    #[test]
    fn test_refit_is_deterministic() {
        let strategy = ArimaStrategy::default();
        let a = strategy.forecast(&gdp_like(), 4).unwrap();
        let b = strategy.forecast(&gdp_like(), 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normal_quantile() {
        assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-5);
    }
}
