// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ARPES container.

use std::collections::BTreeMap;

use log::debug;
use ndarray::prelude::*;

use super::{ke_to_be, ArpesError};
use crate::{constants::*, ndata::NData, read_hdf5::*, Axis, MetaValue, SlitDir};

/// ARPES parameters used to build an [`NArpes`]. Anything not given takes
/// the value of [`ArpesMetadata::default`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArpesMetadata {
    /// The original kinetic energy scale; defaults to the x scale of the data.
    pub ke_scale: Option<Array1<f64>>,
    /// The original detector angle scale; defaults to the y scale of the
    /// data.
    pub ang_scale: Option<Array1<f64>>,
    pub ang_offset: f64,
    pub slit_dir: SlitDir,
    /// Polar angle \[degrees\]
    pub theta_x: f64,
    /// The other angle \[degrees\]
    pub theta_y: f64,
    /// Photon energy \[eV\]
    pub hv: f64,
    /// Analyser work function \[eV\]
    pub wk: f64,
    /// Difference between the actual and nominal photon energies \[eV\]
    pub e_offset: f64,
    pub spectra_info: BTreeMap<String, MetaValue>,
}

impl Default for ArpesMetadata {
    fn default() -> Self {
        ArpesMetadata {
            ke_scale: None,
            ang_scale: None,
            ang_offset: 0.0,
            slit_dir: SlitDir::V,
            theta_x: 0.0,
            theta_y: 0.0,
            hv: DEFAULT_HV,
            wk: DEFAULT_WK,
            e_offset: 0.0,
            spectra_info: BTreeMap::new(),
        }
    }
}

/// An analyser spectrum (or a stack of them) with its ARPES parameters.
///
/// Data axes: x is energy, y is the detector angle and z (if present) is the
/// scan axis (theta, hv, ...). The original kinetic energy and angle scales
/// are kept so that the energy axis can be switched between kinetic and
/// binding energy, and the angle axis re-offset, without losing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct NArpes {
    nd: NData,
    /// The original kinetic energy scale.
    pub ke_scale: Array1<f64>,
    be_scale: Array1<f64>,
    /// The original detector angle scale.
    pub ang_scale: Array1<f64>,
    pub ang_offset: f64,
    pub slit_dir: SlitDir,
    pub theta_x: f64,
    pub theta_y: f64,
    hv: f64,
    wk: f64,
    e_offset: f64,
    /// The angle integrated spectrum.
    pub edc: NData,
    /// The energy integrated spectrum.
    pub mdc: NData,
    pub spectra_info: BTreeMap<String, MetaValue>,
}

impl std::ops::Deref for NArpes {
    type Target = NData;

    fn deref(&self) -> &NData {
        &self.nd
    }
}

impl NArpes {
    /// Attach ARPES parameters to 2D (angle, energy) or 3D data. The EDC and
    /// MDC are computed from the data (summed over the scan axis first for a
    /// volume).
    pub fn from_ndata(nd: NData, meta: ArpesMetadata) -> Result<NArpes, ArpesError> {
        let rank = nd.rank();
        if !(2..=3).contains(&rank) {
            return Err(ArpesError::Rank(rank));
        }
        let ke_scale = match meta.ke_scale {
            Some(s) => s,
            None => nd.scale(Axis::X)?.clone(),
        };
        let ang_scale = match meta.ang_scale {
            Some(s) => s,
            None => nd.scale(Axis::Y)?.clone(),
        };
        check_len("kinetic energy values", nd.len_of(Axis::X)?, ke_scale.len())?;
        check_len("angle values", nd.len_of(Axis::Y)?, ang_scale.len())?;

        let (edc, mdc) = profiles(&nd)?;
        let mut a = NArpes {
            nd,
            ke_scale,
            be_scale: Array1::zeros(0),
            ang_scale,
            ang_offset: meta.ang_offset,
            slit_dir: meta.slit_dir,
            theta_x: meta.theta_x,
            theta_y: meta.theta_y,
            hv: meta.hv,
            wk: meta.wk,
            e_offset: meta.e_offset,
            edc,
            mdc,
            spectra_info: meta.spectra_info,
        };
        a.be_calc();
        Ok(a)
    }

    pub fn ndata(&self) -> &NData {
        &self.nd
    }

    /// Mutable access to the underlying data. Changing the x or y scales
    /// through this doesn't touch the original KE and angle scales.
    pub fn ndata_mut(&mut self) -> &mut NData {
        &mut self.nd
    }

    pub fn into_ndata(self) -> NData {
        self.nd
    }

    pub fn hv(&self) -> f64 {
        self.hv
    }

    pub fn wk(&self) -> f64 {
        self.wk
    }

    pub fn e_offset(&self) -> f64 {
        self.e_offset
    }

    /// The binding energy scale for the current `hv`, `wk` and `e_offset`.
    pub fn be_scale(&self) -> &Array1<f64> {
        &self.be_scale
    }

    /// Recalculate the binding energy scale, BE = hv + E_offset - wk - KE.
    pub fn be_calc(&mut self) {
        let (hv, wk, e_offset) = (self.hv, self.wk, self.e_offset);
        self.be_scale = self.ke_scale.mapv(|ke| ke_to_be(ke, hv, wk, e_offset));
    }

    /// Set the energy axis of the data and the EDC to the original kinetic
    /// energy scale plus the energy offset.
    pub fn scale_ke(&mut self) -> Result<(), ArpesError> {
        let ke = &self.ke_scale + self.e_offset;
        self.nd.update_ax(Axis::X, ke.clone(), KE_UNIT)?;
        self.edc.update_ax(Axis::X, ke, KE_UNIT)?;
        Ok(())
    }

    /// Set the energy axis of the data and the EDC to binding energy.
    pub fn scale_be(&mut self) -> Result<(), ArpesError> {
        self.be_calc();
        self.nd.update_ax(Axis::X, self.be_scale.clone(), BE_UNIT)?;
        self.edc.update_ax(Axis::X, self.be_scale.clone(), BE_UNIT)?;
        Ok(())
    }

    pub fn set_wk(&mut self, wk: f64) {
        self.wk = wk;
        self.be_calc();
    }

    pub fn set_hv(&mut self, hv: f64) {
        self.hv = hv;
        self.be_calc();
    }

    /// Doesn't change the KE scale of the data until [`NArpes::scale_ke`] is
    /// called.
    pub fn set_e_offset(&mut self, e_offset: f64) {
        self.e_offset = e_offset;
        self.be_calc();
    }

    /// Rescale the angle axis of the data and the MDC to
    /// `ang_scale + ang_offset + delta`, where `delta = old - new`. The result
    /// becomes the new `ang_scale`.
    pub fn scale_angle(&mut self, delta: f64) -> Result<(), ArpesError> {
        let new_scale = &self.ang_scale + self.ang_offset + delta;
        self.nd.update_ax(Axis::Y, new_scale.clone(), ANGLE_UNIT)?;
        self.mdc.update_ax(Axis::X, new_scale.clone(), ANGLE_UNIT)?;
        self.ang_scale = new_scale;
        Ok(())
    }

    /// The ARPES parameters as metadata.
    pub fn attributes(&self) -> BTreeMap<String, MetaValue> {
        let mut m = BTreeMap::new();
        m.insert("KEscale".to_string(), self.ke_scale.to_vec().into());
        m.insert("BEscale".to_string(), self.be_scale.to_vec().into());
        m.insert("angScale".to_string(), self.ang_scale.to_vec().into());
        m.insert("angOffset".to_string(), self.ang_offset.into());
        m.insert("slitDir".to_string(), self.slit_dir.to_string().into());
        m.insert("thetaX".to_string(), self.theta_x.into());
        m.insert("thetaY".to_string(), self.theta_y.into());
        m.insert("hv".to_string(), self.hv.into());
        m.insert("wk".to_string(), self.wk.into());
        m.insert("E_offset".to_string(), self.e_offset.into());
        m.insert(
            "spectraInfo".to_string(),
            MetaValue::Map(self.spectra_info.clone()),
        );
        m
    }

    /// Write this container as the group `name` inside `parent`: the nData
    /// group, `EDC` and `MDC` sub-groups and the ARPES parameters.
    pub fn write_group(&self, parent: &hdf5::Group, name: &str) -> Result<hdf5::Group, ArpesError> {
        let g = self.nd.write_group(parent, name)?;
        self.edc.write_group(&g, "EDC")?;
        self.mdc.write_group(&g, "MDC")?;

        for (key, value) in [
            ("hv", self.hv),
            ("wk", self.wk),
            ("thetaX", self.theta_x),
            ("thetaY", self.theta_y),
            ("angOffset", self.ang_offset),
            ("E_offset", self.e_offset),
        ] {
            write_f64_scalar(&g, key, value)?;
        }
        write_f64_dataset(&g, "KEscale", &self.ke_scale.to_vec())?;
        write_f64_dataset(&g, "angScale", &self.ang_scale.to_vec())?;
        write_string_attr(&g, "slitDir", &self.slit_dir.to_string())?;

        let info = g.create_group("spectraInfo")?;
        for (key, value) in self.spectra_info.iter() {
            write_meta_attr(&info, key, value)?;
        }
        Ok(g)
    }

    /// Read a container written by [`NArpes::write_group`].
    pub fn read_group(g: &hdf5::Group) -> Result<NArpes, ArpesError> {
        let nd = NData::read_group(g)?;
        let edc = NData::read_group(&member_group(g, "EDC")?)?;
        let mdc = NData::read_group(&member_group(g, "MDC")?)?;

        let scalar = |name: &str| -> Result<f64, ArpesError> {
            let ds = g
                .dataset(name)
                .map_err(|_| ArpesError::MissingMember(name.to_string()))?;
            let v = read_f64_array(&ds)?;
            v.iter()
                .next()
                .copied()
                .ok_or_else(|| ArpesError::MissingMember(name.to_string()))
        };
        let array = |name: &str| -> Result<Array1<f64>, ArpesError> {
            let ds = g
                .dataset(name)
                .map_err(|_| ArpesError::MissingMember(name.to_string()))?;
            Ok(read_f64_array(&ds)?.iter().copied().collect())
        };

        let slit_dir = match g.attr("slitDir") {
            Ok(a) => read_string(&a)?.parse().map_err(ArpesError::SlitDir)?,
            Err(_) => SlitDir::default(),
        };
        let spectra_info = match g.group("spectraInfo") {
            Ok(info) => read_all_attrs(&info)?,
            Err(_) => BTreeMap::new(),
        };

        let meta = ArpesMetadata {
            ke_scale: Some(array("KEscale")?),
            ang_scale: Some(array("angScale")?),
            ang_offset: scalar("angOffset")?,
            slit_dir,
            theta_x: scalar("thetaX")?,
            theta_y: scalar("thetaY")?,
            hv: scalar("hv")?,
            wk: scalar("wk")?,
            // Older files don't have the energy offset.
            e_offset: scalar("E_offset").unwrap_or(0.0),
            spectra_info,
        };
        let mut a = NArpes::from_ndata(nd, meta)?;
        a.edc = edc;
        a.mdc = mdc;
        debug!("Read ARPES group {}", g.name());
        Ok(a)
    }
}

fn member_group(g: &hdf5::Group, name: &str) -> Result<hdf5::Group, ArpesError> {
    g.group(name)
        .map_err(|_| ArpesError::MissingMember(name.to_string()))
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<(), ArpesError> {
    if expected == got {
        Ok(())
    } else {
        Err(ArpesError::Length {
            what,
            expected,
            got,
        })
    }
}

/// The EDC (angle integrated) and MDC (energy integrated) of 2D or 3D data.
fn profiles(nd: &NData) -> Result<(NData, NData), ArpesError> {
    let img = if nd.rank() == 3 {
        nd.sum_along(Axis::Z)?
    } else {
        nd.clone()
    };
    let edc = img.sum_along(Axis::Y)?;
    let mdc = img.sum_along(Axis::X)?;
    Ok((edc, mdc))
}
