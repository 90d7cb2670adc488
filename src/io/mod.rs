// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Beamline file formats: electron analyser spectra, area detector TIFF
//! frames, decoded scan records and MCA spectra, and the file naming
//! conventions tying them to scan numbers.

pub mod ea;
mod error;
pub mod mca;
pub mod mda;
pub mod scan_list;
pub mod tiff;

pub use ea::{load_ea, EaError, NEa};
pub use error::MdaError;
pub use mda::{MdaAxis, MdaScan};
pub use scan_list::ScanSelection;
pub use tiff::{load_tiff, read_tiff, AxisScale, TiffError};
