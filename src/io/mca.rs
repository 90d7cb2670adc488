// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Multi-channel analyser (MCA) spectra recorded as scans.

use ndarray::prelude::*;

use super::{MdaError, MdaScan};
use crate::{
    ndata::{find_closest, nstack, NData, NDataError},
    Axis,
};

/// The channel of zero emission energy.
const MCA_CHANNEL_OFFSET: f64 = 12.8;
/// Channels per eV.
const MCA_CHANNELS_PER_EV: f64 = 0.72;
const EMISSION_UNIT: &str = "Emission Energy (eV)";

/// The emission energy of each of `n` channels.
pub fn mca_energy_scale(n: usize) -> Array1<f64> {
    Array1::from_shape_fn(n, |i| (i as f64 - MCA_CHANNEL_OFFSET) / MCA_CHANNELS_PER_EV)
}

/// Stack the first detector of each 1D scan into an image, one row per scan.
/// The y scale is the scan number.
pub fn mca_stack(scans: &[MdaScan]) -> Result<NData, MdaError> {
    if scans.is_empty() {
        return Err(MdaError::NoScans);
    }
    let spectra = scans
        .iter()
        .map(|s| {
            let (&det, _) = s
                .detectors
                .iter()
                .next()
                .ok_or(MdaError::NoDetectors(s.scan_num))?;
            s.detector_ndata(det)
        })
        .collect::<Result<Vec<_>, _>>()?;
    let scan_nums: Array1<f64> = scans.iter().map(|s| s.scan_num as f64).collect();
    Ok(nstack(&spectra, Some(scan_nums), "channels")?)
}

/// Scale an MCA image (positioner, channel): x becomes the emission energy
/// and y the first positioner of `scan`.
pub fn scale_mca(mca: &NData, scan: &MdaScan) -> Result<NData, MdaError> {
    let mut mca = mca.clone();
    let n = mca.len_of(Axis::X)?;
    mca.update_ax(Axis::X, mca_energy_scale(n), EMISSION_UNIT)?;
    let p = scan.positioner(Axis::X, 0)?;
    let y: Array1<f64> = p.data.iter().copied().collect();
    mca.update_ax(Axis::Y, y, p.label())?;
    Ok(mca)
}

/// The MCA signal averaged over the emission energies `center ± delta`,
/// against the y scale.
pub fn mca_1d(mca: &NData, center: f64, delta: f64) -> Result<(Array1<f64>, Array1<f64>), MdaError> {
    let em = mca.scale(Axis::X)?.to_vec();
    let i0 = find_closest(&em, center - delta).map_or(0, |c| c.0);
    let i1 = find_closest(&em, center + delta).map_or(0, |c| c.0).max(i0 + 1);
    let img = mca.data().view().into_dimensionality::<Ix2>().map_err(NDataError::from)?;
    let y = img
        .slice(s![.., i0..i1.min(em.len())])
        .mean_axis(ndarray::Axis(1))
        .unwrap_or_else(|| Array1::zeros(img.nrows()));
    Ok((mca.scale(Axis::Y)?.clone(), y))
}

/// The emission spectrum at the y value closest to `hv`.
pub fn mca_1d_hv(mca: &NData, hv: f64) -> Result<(Array1<f64>, Array1<f64>), MdaError> {
    let ys = mca.scale(Axis::Y)?.to_vec();
    let i = find_closest(&ys, hv).map_or(0, |c| c.0);
    let img = mca.data().view().into_dimensionality::<Ix2>().map_err(NDataError::from)?;
    Ok((mca.scale(Axis::X)?.clone(), img.row(i).to_owned()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{io::MdaAxis, Axis};
    use approx::*;
    use ndarray::array;

    fn spectrum(scan_num: u32, counts: Array1<f64>) -> MdaScan {
        let n = counts.len();
        let mut detectors = BTreeMap::new();
        detectors.insert(
            1,
            MdaAxis {
                pv: "mca1".to_string(),
                desc: String::new(),
                unit: String::new(),
                data: counts.into_dyn(),
            },
        );
        MdaScan {
            scan_num,
            rank: 1,
            positioners: vec![vec![MdaAxis {
                pv: "hv".to_string(),
                desc: "Photon energy".to_string(),
                unit: "eV".to_string(),
                data: Array1::from_shape_fn(n, |i| 500.0 + i as f64).into_dyn(),
            }]],
            detectors,
            header: BTreeMap::new(),
        }
    }

    #[test]
    fn energy_scale() {
        let e = mca_energy_scale(3);
        assert_abs_diff_eq!(e[0], -12.8 / 0.72, epsilon = 1e-12);
        assert_abs_diff_eq!(e[2] - e[1], 1.0 / 0.72, epsilon = 1e-12);
    }

    #[test]
    fn stack_scale_and_reduce() {
        let scans = vec![
            spectrum(7, array![1.0, 2.0, 3.0, 4.0]),
            spectrum(8, array![5.0, 6.0, 7.0, 8.0]),
        ];
        let stack = mca_stack(&scans).unwrap();
        assert_eq!(stack.shape(), &[2, 4]);
        assert_eq!(stack.scale(Axis::Y).unwrap(), &array![7.0, 8.0]);
        assert_eq!(stack.unit(Axis::Y), "channels");

        // An MCA image against a 2 point positioner.
        let img = NData::new(array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]).unwrap();
        let scaled = scale_mca(&img, &spectrum(9, array![0.0, 0.0])).unwrap();
        assert_eq!(scaled.scale(Axis::Y).unwrap(), &array![500.0, 501.0]);
        assert_eq!(scaled.unit(Axis::X), EMISSION_UNIT);

        let e = scaled.scale(Axis::X).unwrap().clone();
        let (x, y) = mca_1d(&scaled, (e[1] + e[2]) / 2.0 + 0.1, 0.8).unwrap();
        assert_eq!(x, array![500.0, 501.0]);
        // Channel 1 only; the upper end is exclusive.
        assert_abs_diff_eq!(y, array![2.0, 6.0], epsilon = 1e-12);

        let (x, y) = mca_1d_hv(&scaled, 500.9).unwrap();
        assert_eq!(x, e);
        assert_eq!(y, array![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn empty_stack() {
        assert!(matches!(mca_stack(&[]), Err(MdaError::NoScans)));
    }
}
