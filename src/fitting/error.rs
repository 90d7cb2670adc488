// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with curve fitting.

use thiserror::Error;

use crate::ndata::NDataError;

#[derive(Error, Debug)]
pub enum FitError {
    #[error("x and y must have the same length; got {x} and {y}")]
    Length { x: usize, y: usize },

    #[error("Fitting {needed} coefficients needs at least {needed} points; got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("Expected {expected} initial coefficients, but got {got}")]
    CoefCount { expected: usize, got: usize },

    #[error("The x range ({0}, {1}) selects no points")]
    EmptyRange(f64, f64),

    #[error("Fitting data must contain finite values")]
    NonFinite,

    #[error("Matrix is singular at pivot index {pivot_index}")]
    Singular { pivot_index: usize },

    #[error("{op} fits {expected}-dimensional data; got {got} dimensions")]
    Rank {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    NData(#[from] NDataError),
}
