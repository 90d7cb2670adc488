// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense linear solves and a Levenberg-Marquardt least-squares minimiser.

use log::{debug, warn};
use ndarray::prelude::*;

use super::FitError;

const SINGULAR_PIVOT_EPSILON: f64 = 1.0e-300;
const MAX_LAMBDA: f64 = 1.0e16;
const F_TOL: f64 = 1.0e-12;
const X_TOL: f64 = 1.0e-12;

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
pub(crate) fn solve(a: &Array2<f64>, b: &[f64]) -> Result<Vec<f64>, FitError> {
    let n = b.len();
    let mut m = a.clone();
    let mut x = b.to_vec();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| m[(i, col)].abs().total_cmp(&m[(j, col)].abs()))
            .unwrap_or(col);
        let pivot = m[(pivot_row, col)];
        if !(pivot.abs() > SINGULAR_PIVOT_EPSILON) {
            return Err(FitError::Singular { pivot_index: col });
        }
        if pivot_row != col {
            for k in 0..n {
                m.swap((col, k), (pivot_row, k));
            }
            x.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = m[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[(row, k)] -= factor * m[(col, k)];
            }
            x[row] -= factor * x[col];
        }
    }

    for row in (0..n).rev() {
        let mut value = x[row];
        for k in (row + 1)..n {
            value -= m[(row, k)] * x[k];
        }
        x[row] = value / m[(row, row)];
    }
    Ok(x)
}

/// The inverse of a square matrix, one column at a time.
pub(crate) fn invert(a: &Array2<f64>) -> Result<Array2<f64>, FitError> {
    let n = a.nrows();
    let mut inverse = Array2::zeros((n, n));
    let mut basis = vec![0.0; n];
    for col in 0..n {
        basis.fill(0.0);
        basis[col] = 1.0;
        let solution = solve(a, &basis)?;
        for (row, v) in solution.into_iter().enumerate() {
            inverse[(row, col)] = v;
        }
    }
    Ok(inverse)
}

fn chi2<F: Fn(f64, &[f64]) -> f64>(model: &F, x: &[f64], y: &[f64], p: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - model(xi, p);
            r * r
        })
        .sum()
}

/// Forward-difference Jacobian of the model, (points, parameters).
fn jacobian<F: Fn(f64, &[f64]) -> f64>(model: &F, x: &[f64], p: &[f64]) -> Array2<f64> {
    let mut jac = Array2::zeros((x.len(), p.len()));
    let mut shifted = p.to_vec();
    for j in 0..p.len() {
        let h = f64::EPSILON.sqrt() * p[j].abs().max(1.0);
        shifted[j] = p[j] + h;
        for (i, &xi) in x.iter().enumerate() {
            jac[(i, j)] = (model(xi, &shifted) - model(xi, p)) / h;
        }
        shifted[j] = p[j];
    }
    jac
}

/// The outcome of a least-squares minimisation.
#[derive(Debug, Clone)]
pub(crate) struct Minimum {
    pub(crate) coefs: Vec<f64>,
    /// Parameter covariance, scaled by the residual variance. Infinite when
    /// it can't be estimated.
    pub(crate) covar: Array2<f64>,
}

/// Minimise the sum of squared residuals of `model` against (x, y),
/// starting from `p0`.
pub(crate) fn levenberg_marquardt<F>(
    model: F,
    x: &[f64],
    y: &[f64],
    p0: &[f64],
) -> Result<Minimum, FitError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n_par = p0.len();
    let max_iter = 200 * (n_par + 1);
    let mut p = p0.to_vec();
    let mut current = chi2(&model, x, y, &p);
    if !current.is_finite() {
        return Err(FitError::NonFinite);
    }
    let mut lambda = 1e-3;

    let mut iter = 0;
    'outer: while iter < max_iter {
        iter += 1;
        let jac = jacobian(&model, x, &p);
        let jtj = jac.t().dot(&jac);
        let residuals: Array1<f64> = x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| yi - model(xi, &p))
            .collect();
        let grad = jac.t().dot(&residuals).to_vec();

        loop {
            let mut damped = jtj.clone();
            for j in 0..n_par {
                let d = jtj[(j, j)];
                damped[(j, j)] = if d > 0.0 { d * (1.0 + lambda) } else { lambda };
            }
            let step = match solve(&damped, &grad) {
                Ok(s) => s,
                Err(_) => {
                    lambda *= 10.0;
                    if lambda > MAX_LAMBDA {
                        break 'outer;
                    }
                    continue;
                }
            };
            let trial: Vec<f64> = p.iter().zip(&step).map(|(a, b)| a + b).collect();
            let trial_chi2 = chi2(&model, x, y, &trial);

            if trial_chi2.is_finite() && trial_chi2 <= current {
                let small_step = step
                    .iter()
                    .zip(&p)
                    .all(|(s, v)| s.abs() <= X_TOL * (v.abs() + X_TOL));
                let small_gain = current - trial_chi2 <= F_TOL * current;
                p = trial;
                current = trial_chi2;
                lambda = (lambda / 10.0).max(1e-12);
                if small_step || small_gain || current == 0.0 {
                    break 'outer;
                }
                break;
            }
            lambda *= 10.0;
            if lambda > MAX_LAMBDA {
                break 'outer;
            }
        }
    }
    debug!("Levenberg-Marquardt finished after {iter} iterations; chi2 = {current}");

    let n_points = x.len();
    let jac = jacobian(&model, x, &p);
    let jtj = jac.t().dot(&jac);
    let covar = match invert(&jtj) {
        Ok(inv) if n_points > n_par => inv * (current / (n_points - n_par) as f64),
        _ => {
            warn!("Covariance of the parameters could not be estimated");
            Array2::from_elem((n_par, n_par), f64::INFINITY)
        }
    };
    Ok(Minimum { coefs: p, covar })
}
