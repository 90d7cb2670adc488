// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with collections of scans.

use thiserror::Error;

use super::DataKind;
use crate::{
    arpes::ArpesError,
    config::ConfigError,
    io::{EaError, TiffError},
    ndata::NDataError,
};

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("{kind} scan {scan} isn't loaded")]
    NotLoaded { kind: DataKind, scan: u32 },

    #[error("Couldn't list the {kind} files in '{path}': {source}")]
    Listing {
        kind: DataKind,
        path: String,
        source: std::io::Error,
    },

    #[error("Couldn't load EA scan {scan}: {source}")]
    Ea { scan: u32, source: EaError },

    #[error("Couldn't load TIFF scan {scan}: {source}")]
    Tiff { scan: u32, source: TiffError },

    #[error("Specified dataset file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Arpes(#[from] ArpesError),

    #[error(transparent)]
    NData(#[from] NDataError),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
