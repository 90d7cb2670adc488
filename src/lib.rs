// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Labelled n-dimensional data, detector file loaders and ARPES analysis for the
IEX beamline.

The core type is [`NData`]: an array of rank 1 to 3 with a scale and a unit
per axis and a bag of metadata ("extras"). [`arpes::NArpes`] builds on it for
photoemission spectra, [`io`] reads the beamline's detector files and
[`dataset::IexData`] keeps the scans of an experiment.
 */

pub mod arpes;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod errors;
pub mod fitting;
pub mod interp;
pub mod io;
pub mod ndata;
pub mod profile;
pub(crate) mod read_hdf5;
mod types;
pub mod xas;

pub use errors::*;
pub use ndata::NData;
pub use types::*;

// Python interface.
#[cfg(feature = "python")]
mod python;
