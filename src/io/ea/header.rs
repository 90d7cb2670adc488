// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The IEX beamline PVs recorded alongside each analyser spectrum.

use std::collections::BTreeMap;

use crate::MetaValue;

/// (header key, PV name)
const BEAMLINE_PVS: &[(&str, &str)] = &[
    ("hv", "ActualPhotonEnergy"),
    ("grating", "Grating_Density"),
    ("ID", "ID_Energy_RBV"),
    ("polarization", "ID_Mode_RBV"),
    ("exitSlit", "Slit3C-Size"),
    ("ringCurrent", "RingCurrent"),
];

const SAMPLE_PVS: &[(&str, &str)] = &[
    ("x", "m1_X"),
    ("y", "m2_Y"),
    ("z", "m3_Z"),
    ("theta", "m4_Theta"),
    ("chi", "m5_Chi"),
    ("phi", "m6_Phi"),
    ("TA", "T_A"),
    ("TB", "T_B"),
    ("TEY", "TEY"),
    ("TEY2", "TEY2"),
];

/// Settings of a photon energy scan done by the analyser IOC.
const HV_SCAN_PVS: &[&str] = &[
    "ENERGY:bins",
    "NumBins",
    "SweepBinSize",
    "SweepSteps",
    "ROI:height",
    "ROI:width",
    "sweepStartEnergy",
    "sweepStepEnergy",
    "sweepStopEnergy",
];

pub(crate) const SES_SLIT_PV: &str = "m8_SESslit";

/// The beamline state when a spectrum was taken, grouped by what it
/// describes. PVs missing from a file are missing from their group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IexHeader {
    /// Every PV in the file.
    pub all: BTreeMap<String, MetaValue>,
    pub beamline: BTreeMap<String, MetaValue>,
    pub sample: BTreeMap<String, MetaValue>,
    pub hv_scan_info: BTreeMap<String, MetaValue>,
    /// The analyser settings (the spectra info of the spectrum).
    pub ea_settings: BTreeMap<String, MetaValue>,
}

fn pick(all: &BTreeMap<String, MetaValue>, pvs: &[(&str, &str)]) -> BTreeMap<String, MetaValue> {
    pvs.iter()
        .filter_map(|&(key, pv)| all.get(pv).map(|v| (key.to_string(), v.clone())))
        .collect()
}

impl IexHeader {
    pub fn from_pvs(all: BTreeMap<String, MetaValue>) -> IexHeader {
        let beamline = pick(&all, BEAMLINE_PVS);
        let sample = pick(&all, SAMPLE_PVS);
        let hv_scan_info = HV_SCAN_PVS
            .iter()
            .filter_map(|&pv| all.get(pv).map(|v| (pv.to_string(), v.clone())))
            .collect();
        IexHeader {
            all,
            beamline,
            sample,
            hv_scan_info,
            ea_settings: BTreeMap::new(),
        }
    }

    /// Photon energy \[eV\].
    pub fn hv(&self) -> Option<f64> {
        self.beamline.get("hv").and_then(MetaValue::as_f64)
    }

    /// Sample polar angle \[degrees\].
    pub fn theta(&self) -> Option<f64> {
        self.sample.get("theta").and_then(MetaValue::as_f64)
    }

    /// Sample tilt \[degrees\].
    pub fn chi(&self) -> Option<f64> {
        self.sample.get("chi").and_then(MetaValue::as_f64)
    }

    /// Analyser entrance slit.
    pub fn ses_slit(&self) -> Option<&MetaValue> {
        self.all.get(SES_SLIT_PV)
    }
}
