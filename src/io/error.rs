// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with scan records.

use thiserror::Error;

use crate::{ndata::NDataError, Axis};

#[derive(Error, Debug)]
pub enum MdaError {
    #[error("Scan {scan} has no positioner {n} along {ax}")]
    MissingPositioner { scan: u32, ax: Axis, n: usize },

    #[error("Scan {scan} has no detector {det}")]
    MissingDetector { scan: u32, det: u32 },

    #[error("Scan {0} has no detectors")]
    NoDetectors(u32),

    #[error("No scans were given")]
    NoScans,

    #[error(transparent)]
    NData(#[from] NDataError),
}
