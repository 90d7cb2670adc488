// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with ARPES data.

use thiserror::Error;

use crate::ndata::NDataError;

#[derive(Error, Debug)]
pub enum ArpesError {
    #[error("ARPES data must be 2 or 3 dimensional; got {0} dimensions")]
    Rank(usize),

    #[error("Expected {expected} {what}, but got {got}")]
    Length {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Cannot stack an empty list of spectra")]
    EmptyList,

    #[error("Expected {expected} energy offsets (one per spectrum), but got {got}")]
    OffsetCount { expected: usize, got: usize },

    #[error("An energy scale needs at least two points to define a step")]
    ShortEnergyScale,

    #[error("Can't build an energy scale with a step of {0} eV")]
    EnergyStep(f64),

    #[error("ARPES group is missing '{0}'")]
    MissingMember(String),

    #[error("Invalid slit direction: {0}")]
    SlitDir(String),

    #[error(transparent)]
    NData(#[from] NDataError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
