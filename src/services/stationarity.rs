// src/services/stationarity.rs
//! Augmented Dickey-Fuller unit-root test.
//!
//! Regression with a constant,
//! `Δy_t = α + γ·y_{t-1} + Σ_{i=1..p} δ_i·Δy_{t-i} + ε_t`,
//! with `p` picked by AIC over `0..=maxlag` on a common sample and the test
//! re-run on the full sample for the chosen lag. H0 is a unit root; the
//! statistic is the t-ratio of `γ`.
use log::{debug, info};
use statrs::function::erf::erfc;
use thiserror::Error;

use super::linalg::ols;
use crate::models::{CriticalValues, StationarityResult, TimeSeries};

/// Fewer observations leave the auxiliary regression with too few residual
/// degrees of freedom once lags are added.
pub const MIN_OBSERVATIONS: usize = 10;
pub const SIGNIFICANCE: f64 = 0.05;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("stationarity test needs at least {required} observations, got {actual}")]
    TooShort { required: usize, actual: usize },
    #[error("series contains non-finite values")]
    InvalidData,
    #[error("stationarity test is undefined for this series: {0}")]
    Degenerate(String),
}

pub fn analyze(series: &TimeSeries) -> Result<StationarityResult, AnalysisError> {
    let result = adf_test(&series.values())?;
    info!(
        "ADF statistic {:.4}, p-value {:.4} (lag {}, {} obs): {}",
        result.statistic,
        result.p_value,
        result.used_lag,
        result.n_obs,
        if result.is_stationary { "stationary" } else { "non-stationary" }
    );
    Ok(result)
}

pub fn adf_test(values: &[f64]) -> Result<StationarityResult, AnalysisError> {
    let n = values.len();
    if n < MIN_OBSERVATIONS {
        return Err(AnalysisError::TooShort {
            required: MIN_OBSERVATIONS,
            actual: n,
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InvalidData);
    }

    // The t-ratio is scale invariant; normalising keeps X'X well conditioned
    // for GDP-sized levels.
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return Err(AnalysisError::Degenerate("series is identically zero".into()));
    }
    let y: Vec<f64> = values.iter().map(|v| v / scale).collect();
    let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();

    let maxlag = max_lag(n);
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=maxlag {
        let (x, dep) = design(&y, &dy, lag, maxlag);
        let Some(fit) = ols(&x, &dep) else {
            debug!("ADF lag {} regression is singular, skipping", lag);
            continue;
        };
        if fit.rss <= 0.0 {
            continue;
        }
        let m = dep.len() as f64;
        let aic = m * (fit.rss / m).ln() + 2.0 * fit.beta.len() as f64;
        if best.map_or(true, |(best_aic, _)| aic < best_aic) {
            best = Some((aic, lag));
        }
    }
    let (_, used_lag) =
        best.ok_or_else(|| AnalysisError::Degenerate("no lag order gives a usable regression".into()))?;

    let (x, dep) = design(&y, &dy, used_lag, used_lag);
    let fit = ols(&x, &dep).ok_or_else(|| AnalysisError::Degenerate("singular regression".into()))?;

    let mean = dep.iter().sum::<f64>() / dep.len() as f64;
    let tss: f64 = dep.iter().map(|d| (d - mean).powi(2)).sum();
    if fit.rss <= 1e-12 * tss || fit.rss <= f64::EPSILON {
        return Err(AnalysisError::Degenerate("regression fits the series exactly".into()));
    }

    let statistic = fit
        .t_value(1)
        .ok_or_else(|| AnalysisError::Degenerate("no residual degrees of freedom".into()))?;
    let p_value = mackinnon_p_value(statistic);
    let n_obs = dep.len();

    Ok(StationarityResult {
        statistic,
        p_value,
        used_lag,
        n_obs,
        critical_values: critical_values(n_obs),
        is_stationary: p_value < SIGNIFICANCE,
    })
}

/// Schwert's rule, capped so the largest regression keeps residual degrees of freedom.
pub fn max_lag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(2))
}

/// Rows `t = sample_start..dy.len()`: `Δy_t ~ [1, y_t, Δy_{t-1}, .., Δy_{t-lag}]`.
/// `y_t` is the level preceding `Δy_t = y_{t+1} - y_t`.
fn design(y: &[f64], dy: &[f64], lag: usize, sample_start: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let rows = sample_start..dy.len();
    let x = rows
        .clone()
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(y[t]);
            row.extend((1..=lag).map(|i| dy[t - i]));
            row
        })
        .collect();
    let dep = rows.map(|t| dy[t]).collect();
    (x, dep)
}

/// MacKinnon (1994) approximate p-value, one variable, constant term.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    const TAU_MAX: f64 = 2.74;
    const TAU_MIN: f64 = -18.83;
    const TAU_STAR: f64 = -1.61;
    const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
    const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefs: &[f64] = if statistic <= TAU_STAR { &SMALL_P } else { &LARGE_P };
    standard_normal_cdf(polyval(coefs, statistic))
}

/// MacKinnon (2010) response surface critical values for `n_obs` observations.
pub fn critical_values(n_obs: usize) -> CriticalValues {
    const ONE: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
    const FIVE: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
    const TEN: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

    let inv = 1.0 / n_obs.max(1) as f64;
    CriticalValues {
        one_pct: polyval(&ONE, inv),
        five_pct: polyval(&FIVE, inv),
        ten_pct: polyval(&TEN, inv),
    }
}

/// `c0 + c1·x + c2·x² + ..`
fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}
