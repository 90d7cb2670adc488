// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Scan records as written by the EPICS scan record ("mda" files).

The binary format is decoded elsewhere; these types hold a decoded scan and
turn its detectors into [`NData`].
 */

use std::collections::BTreeMap;

use log::{debug, warn};
use ndarray::prelude::*;

use super::MdaError;
use crate::{ndata::NData, Axis, MetaValue};

/// One positioner or detector of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct MdaAxis {
    pub pv: String,
    pub desc: String,
    pub unit: String,
    pub data: ArrayD<f64>,
}

impl MdaAxis {
    /// The description if it says anything, otherwise the PV name.
    pub fn label(&self) -> &str {
        if self.desc.trim().len() > 1 {
            &self.desc
        } else {
            &self.pv
        }
    }

    /// The readback values along this axis' own dimension. Inner positioners
    /// of multi-dimensional scans store one row per outer point; the first
    /// row is used.
    fn scale(&self) -> Array1<f64> {
        match self.data.ndim() {
            0 => Array1::zeros(0),
            1 => self.data.iter().copied().collect(),
            _ => self
                .data
                .lanes(ndarray::Axis(self.data.ndim() - 1))
                .into_iter()
                .next()
                .map_or_else(|| Array1::zeros(0), |l| l.to_owned()),
        }
    }
}

/// A decoded scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MdaScan {
    pub scan_num: u32,
    pub rank: usize,
    /// The positioners of each dimension; x (the innermost) first.
    pub positioners: Vec<Vec<MdaAxis>>,
    /// Detectors by number.
    pub detectors: BTreeMap<u32, MdaAxis>,
    /// Scan record fields and extra PVs. Extra PVs are `[desc, unit, value]`
    /// lists.
    pub header: BTreeMap<String, MetaValue>,
}

impl MdaScan {
    fn dim(ax: Axis) -> usize {
        match ax {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Positioner `n` of the dimension `ax`.
    pub fn positioner(&self, ax: Axis, n: usize) -> Result<&MdaAxis, MdaError> {
        self.positioners
            .get(Self::dim(ax))
            .and_then(|p| p.get(n))
            .ok_or(MdaError::MissingPositioner {
                scan: self.scan_num,
                ax,
                n,
            })
    }

    pub fn positioner_label(&self, ax: Axis, n: usize) -> Result<&str, MdaError> {
        Ok(self.positioner(ax, n)?.label())
    }

    pub fn detector(&self, det: u32) -> Result<&MdaAxis, MdaError> {
        self.detectors.get(&det).ok_or(MdaError::MissingDetector {
            scan: self.scan_num,
            det,
        })
    }

    pub fn detector_label(&self, det: u32) -> Result<&str, MdaError> {
        Ok(self.detector(det)?.label())
    }

    /// Detector `det` as `NData`, scaled by the first positioner of each of
    /// its dimensions. Detector arrays are stored outermost dimension first
    /// (z, y, x), and are transposed into the `NData` axis order.
    pub fn detector_ndata(&self, det: u32) -> Result<NData, MdaError> {
        let d = self.detector(det)?;
        let rank = d.data.ndim();
        let data = match rank {
            3 => d.data.view().permuted_axes(IxDyn(&[1, 2, 0])).to_owned(),
            _ => d.data.clone(),
        };
        let mut nd = NData::new(data)?;
        for &ax in nd.axes() {
            let Ok(p) = self.positioner(ax, 0) else {
                continue;
            };
            let scale = p.scale();
            if scale.len() == nd.len_of(ax)? {
                nd.update_ax(ax, scale, p.label())?;
            } else {
                warn!(
                    "Scan {}: positioner {} has {} points but detector {det} has {} along {ax}",
                    self.scan_num,
                    p.pv,
                    scale.len(),
                    nd.len_of(ax)?
                );
            }
        }
        nd.update_extras_by_key("scanNum", self.scan_num as i64);
        nd.update_extras_by_key("pv", d.pv.clone());
        nd.update_extras_by_key("desc", d.desc.clone());
        debug!("{}", nd.info());
        Ok(nd)
    }

    /// The header entries whose key contains `search` (ignoring case). Extra
    /// PVs give their value rather than the whole `[desc, unit, value]`
    /// entry.
    pub fn extra_pvs(&self, search: &str) -> Vec<(&str, MetaValue)> {
        let search = search.to_lowercase();
        self.header
            .iter()
            .filter(|(k, _)| k.to_lowercase().contains(&search))
            .map(|(k, v)| (k.as_str(), extra_pv_value(v)))
            .collect()
    }

    fn first_extra_pv(&self, search: &str) -> Option<MetaValue> {
        self.extra_pvs(search).into_iter().next().map(|(_, v)| v)
    }

    /// The photon energy (mono readback) \[eV\].
    pub fn hv(&self) -> Option<f64> {
        self.first_extra_pv("ENERGY_MON").and_then(|v| v.as_f64())
    }

    /// The insertion device polarisation mode.
    pub fn polarization(&self) -> Option<MetaValue> {
        self.first_extra_pv("ActualMode")
    }

    /// The insertion device setpoint \[keV\].
    pub fn id_setpoint(&self) -> Option<f64> {
        self.first_extra_pv("EnergySet").and_then(|v| v.as_f64())
    }
}

fn extra_pv_value(v: &MetaValue) -> MetaValue {
    match v {
        MetaValue::List(entry) if entry.len() == 3 => match &entry[2] {
            MetaValue::List(values) if !values.is_empty() => values[0].clone(),
            MetaValue::Floats(values) if !values.is_empty() => MetaValue::Float(values[0]),
            other => other.clone(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Axis;
    use ndarray::array;

    fn axis(pv: &str, desc: &str, data: ArrayD<f64>) -> MdaAxis {
        MdaAxis {
            pv: pv.to_string(),
            desc: desc.to_string(),
            unit: String::new(),
            data,
        }
    }

    fn scan_2d() -> MdaScan {
        let mut detectors = BTreeMap::new();
        detectors.insert(
            16,
            axis(
                "29idc:TEY",
                "TEY",
                array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn(),
            ),
        );
        detectors.insert(17, axis("29idc:D17", "", array![9.0, 8.0].into_dyn()));
        let mut header = BTreeMap::new();
        header.insert(
            "29idmono:ENERGY_MON".to_string(),
            MetaValue::List(vec![
                "Mono energy".into(),
                "eV".into(),
                MetaValue::Floats(vec![500.5]),
            ]),
        );
        header.insert("rank".to_string(), MetaValue::Int(2));
        MdaScan {
            scan_num: 42,
            rank: 2,
            positioners: vec![
                vec![axis(
                    "29idc:m1",
                    "x",
                    array![[0.0, 0.1, 0.2], [0.0, 0.1, 0.2]].into_dyn(),
                )],
                vec![axis("29idc:m2", "y stage", array![5.0, 6.0].into_dyn())],
            ],
            detectors,
            header,
        }
    }

    #[test]
    fn labels() {
        let scan = scan_2d();
        assert_eq!(scan.positioner_label(Axis::Y, 0).unwrap(), "y stage");
        // One character descriptions aren't descriptive.
        assert_eq!(scan.positioner_label(Axis::X, 0).unwrap(), "29idc:m1");
        assert_eq!(scan.detector_label(16).unwrap(), "TEY");
        assert_eq!(scan.detector_label(17).unwrap(), "29idc:D17");
        assert!(matches!(
            scan.positioner(Axis::Z, 0),
            Err(MdaError::MissingPositioner { scan: 42, .. })
        ));
        assert!(matches!(
            scan.detector(3),
            Err(MdaError::MissingDetector { scan: 42, det: 3 })
        ));
    }

    #[test]
    fn image_detector() {
        let nd = scan_2d().detector_ndata(16).unwrap();
        assert_eq!(nd.shape(), &[2, 3]);
        assert_eq!(nd.scale(Axis::X).unwrap(), &array![0.0, 0.1, 0.2]);
        assert_eq!(nd.scale(Axis::Y).unwrap(), &array![5.0, 6.0]);
        assert_eq!(nd.unit(Axis::Y), "y stage");
        assert_eq!(nd.extras["scanNum"], MetaValue::Int(42));
    }

    #[test]
    fn mismatched_positioner_keeps_index_scale() {
        let nd = scan_2d().detector_ndata(17).unwrap();
        assert_eq!(nd.scale(Axis::X).unwrap(), &array![0.0, 1.0]);
    }

    #[test]
    fn header_search() {
        let scan = scan_2d();
        assert_eq!(scan.hv(), Some(500.5));
        let found = scan.extra_pvs("RANK");
        assert_eq!(found, vec![("rank", MetaValue::Int(2))]);
        assert!(scan.polarization().is_none());
    }
}
