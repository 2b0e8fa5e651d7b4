// src/services/linalg.rs
//! Dense least squares for the handful of small regressions the dashboard runs
//! (ADF auxiliary regressions, Prophet-style trend fits). Matrices are row-major
//! `Vec<Vec<f64>>` and never more than a few dozen columns wide.

const PIVOT_EPS: f64 = 1e-12;

/// Solves `a · x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` when `a` is singular.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    let scale = max_abs(&a);

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() <= PIVOT_EPS * scale {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|j| a[i][j] * x[j]).sum();
        x[i] = (b[i] - tail) / a[i][i];
    }
    Some(x)
}

/// Inverts a square matrix by Gauss-Jordan elimination.
pub fn invert(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    if a.iter().any(|row| row.len() != n) {
        return None;
    }
    let scale = max_abs(a);

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| aug[i][col].abs().total_cmp(&aug[j][col].abs()))?;
        if aug[pivot_row][col].abs() <= PIVOT_EPS * scale {
            return None;
        }
        aug.swap(col, pivot_row);

        let pivot = aug[col][col];
        for v in aug[col].iter_mut() {
            *v /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..(2 * n) {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    Some(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// `X'X` and `X'y` for a row-major design matrix.
pub fn normal_equations(x: &[Vec<f64>], y: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let k = x.first().map_or(0, |row| row.len());
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in x.iter().zip(y) {
        for j in 0..k {
            xty[j] += row[j] * yi;
            for l in j..k {
                xtx[j][l] += row[j] * row[l];
            }
        }
    }
    for j in 0..k {
        for l in 0..j {
            xtx[j][l] = xtx[l][j];
        }
    }
    (xtx, xty)
}

#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: Vec<f64>,
    pub rss: f64,
    pub n_obs: usize,
    /// `(X'X)^-1`, for coefficient standard errors.
    pub xtx_inv: Vec<Vec<f64>>,
}

impl OlsFit {
    pub fn df_resid(&self) -> usize {
        self.n_obs.saturating_sub(self.beta.len())
    }

    /// t-ratio of coefficient `j`; `None` when the residual variance is zero
    /// or there are no residual degrees of freedom.
    pub fn t_value(&self, j: usize) -> Option<f64> {
        let df = self.df_resid();
        if df == 0 {
            return None;
        }
        let var = self.rss / df as f64 * self.xtx_inv[j][j];
        if !var.is_finite() || var <= 0.0 {
            return None;
        }
        Some(self.beta[j] / var.sqrt())
    }
}

/// Ordinary least squares. `None` if the design is rank deficient or has more
/// columns than rows.
pub fn ols(x: &[Vec<f64>], y: &[f64]) -> Option<OlsFit> {
    let n = y.len();
    let k = x.first().map_or(0, |row| row.len());
    if k == 0 || x.len() != n || n < k {
        return None;
    }

    let (xtx, xty) = normal_equations(x, y);
    let xtx_inv = invert(&xtx)?;
    let beta = solve(xtx, xty)?;
    let rss = x
        .iter()
        .zip(y)
        .map(|(row, &yi)| {
            let fitted: f64 = row.iter().zip(&beta).map(|(a, b)| a * b).sum();
            (yi - fitted).powi(2)
        })
        .sum();

    Some(OlsFit { beta, rss, n_obs: n, xtx_inv })
}

fn max_abs(a: &[Vec<f64>]) -> f64 {
    let m = a.iter().flatten().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if m > 0.0 {
        m
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_2x2() {
        let x = solve(vec![vec![2.0, 1.0], vec![1.0, 3.0]], vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_solve_singular() {
        assert!(solve(vec![vec![1.0, 2.0], vec![2.0, 4.0]], vec![1.0, 2.0]).is_none());
    }

    #[test]
    fn test_invert_roundtrip_identity() {
        let a = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&a).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let v: f64 = (0..2).map(|k| a[i][k] * inv[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_ols_recovers_line() {
        let xs: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let ys: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64 + if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
        let fit = ols(&xs, &ys).unwrap();
        assert!((fit.beta[0] - 3.0).abs() < 0.2);
        assert!((fit.beta[1] - 2.0).abs() < 0.05);
        assert!(fit.t_value(1).unwrap() > 10.0);
    }
}
