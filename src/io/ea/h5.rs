// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Files from the current (HDF5) analyser driver.

use std::collections::BTreeMap;

use ndarray::prelude::*;

use super::{read_pvs, AcqMode, EaError, EaSettings, RawEa};
use crate::{read_hdf5::read_f64_array, MetaValue};

const DATA: &str = "entry/instrument/detector/data";
const ATTRIBUTES: &str = "entry/instrument/NDAttributes";

/// Drop leading unit dimensions (a single frame) from an image.
pub(super) fn squeeze_image(mut data: ArrayD<f64>) -> Result<Array2<f64>, EaError> {
    while data.ndim() > 2 && data.shape()[0] == 1 {
        data = data.index_axis_move(ndarray::Axis(0), 0);
    }
    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix2>()
        .map_err(|_| EaError::ImageShape(shape))
}

pub(super) fn f64_pv(pvs: &BTreeMap<String, MetaValue>, pv: &str) -> Option<f64> {
    pvs.get(pv).and_then(MetaValue::as_f64)
}

pub(super) fn read(file: &hdf5::File) -> Result<RawEa, EaError> {
    let ds = file.dataset(DATA).map_err(|_| EaError::MissingData(DATA))?;
    let image = squeeze_image(read_f64_array(&ds)?)?;

    let attrs = file
        .group(ATTRIBUTES)
        .map_err(|_| EaError::MissingData(ATTRIBUTES))?;
    let pvs = read_pvs(&attrs, "")?;

    let mode = pvs
        .get("SpectraMode")
        .and_then(MetaValue::as_i64)
        .ok_or(EaError::MissingPv("SpectraMode"))?;
    let acq_mode = AcqMode::from_spectra_mode(mode).ok_or(EaError::SpectraMode(mode))?;

    let mut settings = EaSettings {
        acq_mode,
        lens_mode: pvs.get("LensMode").cloned(),
        pass_energy: pvs.get("PassEnergy").cloned(),
        frames: pvs.get("ExpFrames").cloned(),
        sweeps: pvs.get("Sweeps").cloned(),
        wk: f64_pv(&pvs, "WorkFunction"),
        ..Default::default()
    };
    match acq_mode {
        AcqMode::Fixed => {
            settings.kinetic_energy = f64_pv(&pvs, "fixedEnergy");
            settings.energy_per_pixel = f64_pv(&pvs, "pixelEnergy");
        }
        AcqMode::BabySweep => {
            settings.kinetic_energy = f64_pv(&pvs, "babySweepCenter");
            settings.energy_per_pixel = f64_pv(&pvs, "babySweepStepSize");
        }
        AcqMode::Swept => {
            settings.swept_start = f64_pv(&pvs, "sweepStartEnergy");
            settings.swept_step = f64_pv(&pvs, "sweepStepEnergy");
        }
    }

    Ok(RawEa {
        image,
        settings,
        pvs,
    })
}
