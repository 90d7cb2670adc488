// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Curve fitting of 1D data.

The peak and edge models take four coefficients `[A, x0, width, bkgd]`:

- Gaussian: `bkgd + A exp(-(x - x0)^2 / (2 width^2))`
- Lorentzian: `bkgd + A/pi width / ((x - x0)^2 + width^2)`
- Step: `bkgd + A erfc((x - x0) / width)`
- Box: `bkgd + A` for `x0 - width/2 < x < x0 + width/2`, otherwise `bkgd`

and are fitted with Levenberg-Marquardt. Polynomials are fitted by linear
least squares.
 */

mod error;
mod lm;
pub mod special;

pub use error::FitError;

use std::collections::BTreeMap;
use std::f64::consts::{LN_2, PI};

use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;

use crate::{
    ndata::{find_closest, NData},
    Axis,
};
use lm::{levenberg_marquardt, solve};
use special::erfc;

/// The function fitted to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitKind {
    Gaussian,
    Lorentzian,
    Step,
    Box,
    /// A polynomial of the given rank.
    Poly(usize),
}

impl FitKind {
    /// The number of coefficients of this model.
    pub fn n_coefs(self) -> usize {
        match self {
            FitKind::Poly(rank) => rank + 1,
            _ => 4,
        }
    }

    /// Evaluate the model at `x`.
    pub fn eval(self, x: f64, coefs: &[f64]) -> f64 {
        match self {
            FitKind::Gaussian => gaussian(x, coefs),
            FitKind::Lorentzian => lorentzian(x, coefs),
            FitKind::Step => step(x, coefs),
            FitKind::Box => boxcar(x, coefs),
            FitKind::Poly(_) => polyval(x, coefs),
        }
    }
}

fn gaussian(x: f64, c: &[f64]) -> f64 {
    let (a, x0, sigma, bkgd) = (c[0], c[1], c[2], c[3]);
    bkgd + a * (-(x - x0).powi(2) / (2.0 * sigma * sigma)).exp()
}

fn lorentzian(x: f64, c: &[f64]) -> f64 {
    let (a, x0, sigma, bkgd) = (c[0], c[1], c[2], c[3]);
    bkgd + a / PI * sigma / ((x - x0).powi(2) + sigma * sigma)
}

fn step(x: f64, c: &[f64]) -> f64 {
    let (a, x0, width, bkgd) = (c[0], c[1], c[2], c[3]);
    bkgd + a * erfc((x - x0) / width)
}

fn boxcar(x: f64, c: &[f64]) -> f64 {
    let (a, x0, width, bkgd) = (c[0], c[1], c[2], c[3]);
    if x0 - width / 2.0 < x && x < x0 + width / 2.0 {
        bkgd + a
    } else {
        bkgd
    }
}

/// Evaluate a polynomial with coefficients in increasing order of power.
pub fn polyval(x: f64, coefs: &[f64]) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Least-squares polynomial coefficients (increasing order of power).
pub fn polyfit(x: &[f64], y: &[f64], rank: usize) -> Result<Vec<f64>, FitError> {
    let n = rank + 1;
    if x.len() < n {
        return Err(FitError::TooFewPoints {
            needed: n,
            got: x.len(),
        });
    }
    let vander = Array2::from_shape_fn((x.len(), n), |(i, j)| x[i].powi(j as i32));
    let normal = vander.t().dot(&vander);
    let rhs = vander.t().dot(&ArrayView1::from(y)).to_vec();
    solve(&normal, &rhs)
}

/// Options common to all fits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitOptions {
    /// Only fit the points between the x values closest to these.
    pub xrange: Option<(f64, f64)>,
    /// Initial coefficients, replacing the automatic guess.
    pub coefs_0: Option<Vec<f64>>,
}

/// The result of a fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub kind: FitKind,
    /// The x values that were fitted.
    pub x_fit: Array1<f64>,
    /// The fitted model evaluated at `x_fit`.
    pub y_fit: Array1<f64>,
    pub coefs: Vec<f64>,
    /// The covariance of the coefficients; not estimated for polynomials.
    pub covar: Option<Array2<f64>>,
    /// Physically meaningful values derived from the coefficients.
    pub fit_vals: BTreeMap<String, f64>,
}

impl FitResult {
    /// The standard errors of the coefficients.
    pub fn std_errors(&self) -> Option<Vec<f64>> {
        self.covar
            .as_ref()
            .map(|c| c.diag().iter().map(|v| v.sqrt()).collect())
    }
}

/// The part of (x, y) selected by `xrange`. The end point is exclusive.
fn subrange<'a>(
    x: &'a [f64],
    y: &'a [f64],
    xrange: Option<(f64, f64)>,
) -> Result<(&'a [f64], &'a [f64]), FitError> {
    match xrange {
        None => Ok((x, y)),
        Some((lo, hi)) => {
            let i0 = find_closest(x, lo).map(|c| c.0);
            let i1 = find_closest(x, hi).map(|c| c.0);
            match (i0, i1) {
                (Some(i0), Some(i1)) if i0 != i1 => {
                    let (a, b) = (i0.min(i1), i0.max(i1));
                    Ok((&x[a..b], &y[a..b]))
                }
                _ => Err(FitError::EmptyRange(lo, hi)),
            }
        }
    }
}

fn max_min(y: &[f64]) -> (f64, f64) {
    y.iter().fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), &v| {
        (hi.max(v), lo.min(v))
    })
}

fn mean(y: &[f64]) -> f64 {
    y.iter().sum::<f64>() / y.len() as f64
}

/// The x value whose y is closest to `target`.
fn x_at(x: &[f64], y: &[f64], target: f64) -> f64 {
    find_closest(y, target).map_or(x[0], |(i, _)| x[i])
}

/// Automatic initial coefficients for the four-coefficient models.
fn guess(kind: FitKind, x: &[f64], y: &[f64]) -> Vec<f64> {
    let (y_max, y_min) = max_min(y);
    let y_mean = mean(y);
    let dx = (x[x.len() - 1] - x[0]).abs() / x.len() as f64;
    let nonzero = |w: f64| if w > 0.0 { w } else { dx };
    match kind {
        FitKind::Gaussian | FitKind::Lorentzian => {
            let i_max = y.iter().position(|&v| v == y_max).unwrap_or(0);
            let x0 = x[i_max];
            let x1 = x_at(x, y, y_max / 2.0);
            vec![y_max, x0, nonzero((x1 - x0).abs() / 2.0), y_mean]
        }
        FitKind::Step | FitKind::Box => {
            let sign = mean(&y.iter().map(|v| v.signum()).collect::<Vec<_>>());
            let a = sign * (y_max - y_min) / 2.0;
            let x0 = x_at(x, y, y_mean);
            let x1 = x_at(x, y, 1.25 * y_mean);
            let width = if kind == FitKind::Box {
                (x1 - x0).abs() / 2.0
            } else {
                (x1 - x0).abs()
            };
            vec![a, x0, nonzero(width), y_min]
        }
        FitKind::Poly(rank) => vec![0.0; rank + 1],
    }
}

fn fit_vals(kind: FitKind, coefs: &[f64]) -> BTreeMap<String, f64> {
    let named = |names: [&str; 3], values: [f64; 3]| {
        names
            .iter()
            .zip(values)
            .map(|(n, v)| (n.to_string(), v))
            .collect()
    };
    match kind {
        FitKind::Gaussian => named(
            ["Amp", "center", "FWHM"],
            [coefs[0], coefs[1], (8.0 * LN_2).sqrt() * coefs[2].abs()],
        ),
        FitKind::Lorentzian => named(
            ["Amp", "center", "FWHM"],
            [coefs[0], coefs[1], 2.0 * coefs[2].abs()],
        ),
        FitKind::Step | FitKind::Box => {
            named(["height", "center", "width"], [coefs[0], coefs[1], coefs[2]])
        }
        FitKind::Poly(_) => coefs
            .iter()
            .enumerate()
            .map(|(i, &c)| (format!("c{i}"), c))
            .collect(),
    }
}

/// Fit `kind` to (x, y).
pub fn fit(x: &[f64], y: &[f64], kind: FitKind, opts: &FitOptions) -> Result<FitResult, FitError> {
    if x.len() != y.len() {
        return Err(FitError::Length {
            x: x.len(),
            y: y.len(),
        });
    }
    let (x_fit, y_fit) = subrange(x, y, opts.xrange)?;
    let n = kind.n_coefs();
    if x_fit.len() < n {
        return Err(FitError::TooFewPoints {
            needed: n,
            got: x_fit.len(),
        });
    }
    if x_fit.iter().chain(y_fit).any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }

    let (coefs, covar) = match kind {
        FitKind::Poly(rank) => (polyfit(x_fit, y_fit, rank)?, None),
        _ => {
            let coefs_0 = match &opts.coefs_0 {
                Some(c) if c.len() == n => c.clone(),
                Some(c) => {
                    return Err(FitError::CoefCount {
                        expected: n,
                        got: c.len(),
                    })
                }
                None => guess(kind, x_fit, y_fit),
            };
            debug!("{kind:?} fit starting from {coefs_0:?}");
            let min = levenberg_marquardt(|xi, c| kind.eval(xi, c), x_fit, y_fit, &coefs_0)?;
            (min.coefs, Some(min.covar))
        }
    };

    let x_fit = Array1::from(x_fit.to_vec());
    let y_model = x_fit.mapv(|xi| kind.eval(xi, &coefs));
    Ok(FitResult {
        kind,
        fit_vals: fit_vals(kind, &coefs),
        x_fit,
        y_fit: y_model,
        coefs,
        covar,
    })
}

/// Fit a 1D `NData` against its x scale.
pub fn fit_nd(nd: &NData, kind: FitKind, opts: &FitOptions) -> Result<FitResult, FitError> {
    if nd.rank() != 1 {
        return Err(FitError::Rank {
            op: "fit_nd",
            expected: 1,
            got: nd.rank(),
        });
    }
    let x = nd.scale(Axis::X)?.to_vec();
    let y: Vec<f64> = nd.data().iter().copied().collect();
    fit(&x, &y, kind, opts)
}

/// Fits of every row of a 2D data set.
#[derive(Debug, Clone)]
pub struct StackFit {
    /// The fitted curves, (y, x_fit).
    pub curves: NData,
    pub results: Vec<FitResult>,
}

impl StackFit {
    /// One of the `fit_vals` for every row, e.g. the peak centres.
    pub fn fit_val(&self, key: &str) -> Option<Array1<f64>> {
        self.results
            .iter()
            .map(|r| r.fit_vals.get(key).copied())
            .collect::<Option<Vec<_>>>()
            .map(Array1::from)
    }
}

/// Fit every row (constant y) of a 2D `NData` against its x scale, in
/// parallel.
pub fn fit_nd_stack(nd: &NData, kind: FitKind, opts: &FitOptions) -> Result<StackFit, FitError> {
    if nd.rank() != 2 {
        return Err(FitError::Rank {
            op: "fit_nd_stack",
            expected: 2,
            got: nd.rank(),
        });
    }
    let x = nd.scale(Axis::X)?.to_vec();
    let rows: Vec<Vec<f64>> = nd
        .data()
        .outer_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    let results: Vec<FitResult> = rows
        .par_iter()
        .map(|y| fit(&x, y, kind, opts))
        .collect::<Result<_, _>>()?;

    let n_fit = results.first().map_or(0, |r| r.x_fit.len());
    let mut curves = Array2::zeros((results.len(), n_fit));
    for (mut row, r) in curves.outer_iter_mut().zip(&results) {
        row.assign(&r.y_fit);
    }
    let x_fit = results
        .first()
        .map_or_else(|| Array1::zeros(0), |r| r.x_fit.clone());
    let curves = NData::new(curves)?
        .with_ax(Axis::X, x_fit, nd.unit(Axis::X))?
        .with_ax(Axis::Y, nd.scale(Axis::Y)?.clone(), nd.unit(Axis::Y))?;
    Ok(StackFit { curves, results })
}
