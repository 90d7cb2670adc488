// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with loading electron analyser files.

use thiserror::Error;

use crate::{arpes::ArpesError, config::ConfigError, ndata::NDataError};

#[derive(Error, Debug)]
pub enum EaError {
    #[error("Specified analyser file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("Don't know how to read analyser files with extension '{0}' (expected 'h5' or 'nc')")]
    UnknownFormat(String),

    #[error("Analyser file has no '{0}'")]
    MissingData(&'static str),

    #[error("Analyser file has no '{0}' PV, which is needed to scale the energy")]
    MissingPv(&'static str),

    #[error("Expected an analyser image (angle, energy), but the data has shape {0:?}")]
    ImageShape(Vec<usize>),

    #[error("Unknown Scienta spectra mode {0}")]
    SpectraMode(i64),

    #[error("Couldn't get a scan number out of the file name '{0}'")]
    ScanNum(String),

    #[error("Can't crop angle rows {start}..{stop} of an image with {rows} rows")]
    Crop { start: usize, stop: usize, rows: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Arpes(#[from] ArpesError),

    #[error(transparent)]
    NData(#[from] NDataError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
