// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Files from the pre-2021 (netCDF-4) analyser driver.

use log::warn;

use super::{
    h5::{f64_pv, squeeze_image},
    read_pvs, AcqMode, EaError, EaSettings, RawEa,
};
use crate::{read_hdf5::read_f64_array, MetaValue};

const DATA: &str = "array_data";

pub(super) fn read(file: &hdf5::File) -> Result<RawEa, EaError> {
    let ds = file.dataset(DATA).map_err(|_| EaError::MissingData(DATA))?;
    let mut data = read_f64_array(&ds)?;
    // Only the first frame is used.
    if data.ndim() == 3 && data.shape()[0] > 1 {
        warn!("{} frames in '{DATA}'; using the first", data.shape()[0]);
        data = data.index_axis_move(ndarray::Axis(0), 0);
    }
    let image = squeeze_image(data)?;

    let pvs = read_pvs(file, "Attr_")?;
    let acq_mode = match pvs.get("AcquisitionMode").and_then(MetaValue::as_i64) {
        Some(code) => AcqMode::from_code(code).ok_or(EaError::SpectraMode(code))?,
        None => return Err(EaError::MissingPv("AcquisitionMode")),
    };
    let settings = EaSettings {
        acq_mode,
        swept_start: f64_pv(&pvs, "LowEnergy"),
        swept_step: f64_pv(&pvs, "EnergyStep_Swept"),
        kinetic_energy: f64_pv(&pvs, "CentreEnergy_RBV"),
        energy_per_pixel: f64_pv(&pvs, "EnergyStep_Fixed_RBV"),
        lens_mode: pvs.get("LensMode").cloned(),
        pass_energy: pvs.get("PassEnergy").cloned(),
        frames: pvs.get("Frames").cloned(),
        sweeps: pvs.get("NumExposures_RBV").cloned(),
        wk: f64_pv(&pvs, "Energy Offset"),
    };

    Ok(RawEa {
        image,
        settings,
        pvs,
    })
}
