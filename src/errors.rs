// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with all aspects of iexplot.
 */

use thiserror::Error;

use crate::{
    arpes::ArpesError,
    config::ConfigError,
    dataset::DatasetError,
    fitting::FitError,
    io::{EaError, MdaError, TiffError},
    ndata::NDataError,
};

/// Any error this crate can produce. Each module has its own error type; this
/// is for callers that don't care which one they got.
#[derive(Error, Debug)]
pub enum IexplotError {
    #[error(transparent)]
    NData(#[from] NDataError),

    #[error(transparent)]
    Arpes(#[from] ArpesError),

    #[error(transparent)]
    Fit(#[from] FitError),

    #[error(transparent)]
    Mda(#[from] MdaError),

    #[error(transparent)]
    Ea(#[from] EaError),

    #[error(transparent)]
    Tiff(#[from] TiffError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
