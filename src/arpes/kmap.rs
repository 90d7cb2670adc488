// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Momentum maps: converting spectra and scans of spectra from angles to
//! momentum.

use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::*;
use crate::{
    constants::{BE_UNIT, DEFAULT_V0, KE_UNIT},
    interp::{interp1d, interp2d, interp3d, linspace},
    ndata::{nstack, NData},
    Axis,
};

const KX_UNIT: &str = "kx (1/Å)";
const KY_UNIT: &str = "ky (1/Å)";

/// The ranges of energy and momentum covered by one or more spectra.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KBounds {
    pub ke_min: f64,
    pub ke_max: f64,
    pub kx_min: f64,
    pub kx_max: f64,
    pub ky_min: f64,
    pub ky_max: f64,
    pub kz_min: f64,
    pub kz_max: f64,
}

impl KBounds {
    fn merge(self, other: KBounds) -> KBounds {
        KBounds {
            ke_min: self.ke_min.min(other.ke_min),
            ke_max: self.ke_max.max(other.ke_max),
            kx_min: self.kx_min.min(other.kx_min),
            kx_max: self.kx_max.max(other.kx_max),
            ky_min: self.ky_min.min(other.ky_min),
            ky_max: self.ky_max.max(other.ky_max),
            kz_min: self.kz_min.min(other.kz_min),
            kz_max: self.kz_max.max(other.kz_max),
        }
    }
}

/// The (min, max) of the non-NaN values of `it`.
fn min_max<I: IntoIterator<Item = f64>>(it: I) -> (f64, f64) {
    it.into_iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

/// The smallest magnitude in `[lo, hi]`; zero if the range spans zero.
fn min_abs(lo: f64, hi: f64) -> f64 {
    if lo <= 0.0 && hi >= 0.0 {
        0.0
    } else {
        lo.abs().min(hi.abs())
    }
}

/// The energy and momentum ranges of a single spectrum, for inner potential
/// `v0`. The smallest kz comes from the largest in-plane momenta at the
/// lowest kinetic energy, and the largest kz from the smallest in-plane
/// momenta at the highest kinetic energy.
pub fn kmapping_boundaries_slice(ea: &NArpes, v0: f64) -> KBounds {
    let (ke_min, ke_max) = min_max(ea.ke_scale.iter().copied());
    let (ang_min, ang_max) = min_max(ea.ang_scale.iter().copied());

    let mut kx = Vec::with_capacity(4);
    let mut ky = Vec::with_capacity(4);
    for ke in [ke_min, ke_max] {
        for ang in [ang_min, ang_max] {
            match ea.slit_dir {
                SlitDir::H => {
                    kx.push(theta_to_kx(ke, ea.theta_x + ang));
                    ky.push(theta_to_ky(ke, ea.theta_x + ang, ea.theta_y));
                }
                SlitDir::V => {
                    kx.push(theta_to_kx(ke, ea.theta_x));
                    ky.push(theta_to_ky(ke, ea.theta_x, ang));
                }
            }
        }
    }
    let (kx_min, kx_max) = min_max(kx);
    let (ky_min, ky_max) = min_max(ky);

    let kz_min = k_to_kz(
        kx_min.abs().max(kx_max.abs()),
        ky_min.abs().max(ky_max.abs()),
        ke_min,
        v0,
    );
    let kz_max = k_to_kz(
        min_abs(kx_min, kx_max),
        min_abs(ky_min, ky_max),
        ke_max,
        v0,
    );

    KBounds {
        ke_min,
        ke_max,
        kx_min,
        kx_max,
        ky_min,
        ky_max,
        kz_min,
        kz_max,
    }
}

/// The combined ranges of all the spectra in `list`.
pub fn kmapping_boundaries(list: &[NArpes], v0: f64) -> Result<KBounds, ArpesError> {
    list.iter()
        .map(|ea| kmapping_boundaries_slice(ea, v0))
        .reduce(KBounds::merge)
        .ok_or(ArpesError::EmptyList)
}

/// Convert every spectrum of `list` to momentum and stack them.
///
/// The momentum (kx for a horizontal slit, ky for a vertical one) and kinetic
/// energy grids span all spectra, with as many points as the first spectrum
/// has angles and energies. The energy grid spans the kinetic energies after
/// each spectrum's offset is added. Each spectrum is resampled with
/// [`arpes_angle_k`] and then onto the energy grid; the result is
/// (k, energy, spectrum) with an index z scale. Points that no spectrum
/// covers are NaN.
pub fn kmapping_stack(
    list: &[NArpes],
    be: bool,
    ke_offset: &EnergyOffset,
) -> Result<NData, ArpesError> {
    let bounds = kmapping_boundaries(list, DEFAULT_V0)?;
    let first = &list[0];
    let offsets = ke_offset.resolve(list.len())?;

    let (k_new, k_unit) = match first.slit_dir {
        SlitDir::H => (
            linspace(bounds.kx_min, bounds.kx_max, first.ang_scale.len()),
            KX_UNIT,
        ),
        SlitDir::V => (
            linspace(bounds.ky_min, bounds.ky_max, first.ang_scale.len()),
            KY_UNIT,
        ),
    };
    let (ke_min, ke_max) = min_max(
        list.iter()
            .zip(&offsets)
            .flat_map(|(ea, &off)| ea.ke_scale.iter().map(move |&e| e + off)),
    );
    let ke_new = linspace(ke_min, ke_max, first.ke_scale.len());
    let ke_new_vec = ke_new.to_vec();

    let slices: Vec<NData> = list
        .par_iter()
        .zip(offsets.par_iter())
        .map(|(ea, &off)| {
            let img = ea.data().view().into_dimensionality::<Ix2>()?;
            let img_k = arpes_angle_k(
                &k_new,
                img,
                &ea.ke_scale,
                &ea.ang_scale,
                ea.theta_x,
                off,
                ea.slit_dir,
            );
            let ke: Vec<f64> = ea.ke_scale.iter().map(|&e| e + off).collect();
            let mut out = Array2::from_elem((k_new.len(), ke_new.len()), f64::NAN);
            for (row_in, mut row_out) in img_k.outer_iter().zip(out.outer_iter_mut()) {
                row_out.assign(&interp1d(&ke, &row_in.to_vec(), &ke_new_vec));
            }
            Ok(NData::new(out)?)
        })
        .collect::<Result<_, ArpesError>>()?;

    let mut nd = nstack(&slices, None, "")?;
    if be {
        let be_scale = ke_new.mapv(|ke| ke_to_be(ke, first.hv(), first.wk(), first.e_offset()));
        nd.update_ax(Axis::X, be_scale, BE_UNIT)?;
    } else {
        nd.update_ax(Axis::X, ke_new, KE_UNIT)?;
    }
    nd.update_ax(Axis::Y, k_new, k_unit)?;
    debug!("{}", nd.info());
    Ok(nd)
}

/// Convert a polar (thetaX) scan to a constant energy map volume.
///
/// `stack` is (thetaY, KE, thetaX): the detector angle along y, the kinetic
/// energy along x and the polar angle along z. The result is (ky, kx, BE),
/// resampled with trilinear interpolation onto grids spanning the scan, with
/// as many points as the original angle scales.
pub fn kmap_scan_theta_x(stack: &NArpes) -> Result<NData, ArpesError> {
    if stack.rank() != 3 {
        return Err(ArpesError::Rank(stack.rank()));
    }
    let ke = stack.ke_scale.clone();
    let theta_y = stack.scale(Axis::Y)?.clone();
    let theta_x = stack.scale(Axis::Z)?.clone();
    let vol = stack.data().view().into_dimensionality::<Ix3>()?;

    let (ke_min, ke_max) = min_max(ke.iter().copied());
    let (tx_min, tx_max) = min_max(theta_x.iter().copied());
    let (ty_min, ty_max) = min_max(theta_y.iter().copied());
    let mut kx = vec![];
    let mut ky = vec![];
    for e in [ke_min, ke_max] {
        for tx in [tx_min, tx_max] {
            kx.push(theta_to_kx(e, tx));
            for ty in [ty_min, ty_max] {
                ky.push(theta_to_ky(e, tx, ty));
            }
        }
    }
    let (kx_min, kx_max) = min_max(kx);
    let (ky_min, ky_max) = min_max(ky);
    let kx_scale = linspace(kx_min, kx_max, theta_x.len());
    let ky_scale = linspace(ky_min, ky_max, theta_y.len());

    let axes = (theta_y.view(), ke.view(), theta_x.view());
    let rows: Vec<Array2<f64>> = ky_scale
        .to_vec()
        .into_par_iter()
        .map(|ky| {
            Array2::from_shape_fn((kx_scale.len(), ke.len()), |(j, k)| {
                let e = ke[k];
                let kx = kx_scale[j];
                let tx = k_to_theta_x(e, kx);
                let ty = k_to_theta_y(e, kx, ky);
                interp3d(axes, vol, (ty, e, tx))
            })
        })
        .collect();
    let views: Vec<_> = rows.iter().map(|r| r.view()).collect();
    let data = ndarray::stack(ndarray::Axis(0), &views)?;

    let be = ke.mapv(|e| ke_to_be(e, stack.hv(), stack.wk(), stack.e_offset()));
    let nd = NData::new(data)?
        .with_ax(Axis::X, kx_scale, KX_UNIT)?
        .with_ax(Axis::Y, ky_scale, KY_UNIT)?
        .with_ax(Axis::Z, be, BE_UNIT)?;
    Ok(nd)
}

/// Convert a photon energy scan to a (BE, ky, hv) volume.
///
/// `stack` is (thetaY, KE, hv). As the binding energy of a pixel depends on
/// the photon energy, every slice is resampled onto a common binding energy
/// grid (BE = hv - wk - KE, from high to low) and a ky grid (at normal
/// emission in thetaX).
pub fn kmap_scan_hv(stack: &NData, wk: f64) -> Result<NData, ArpesError> {
    if stack.rank() != 3 {
        return Err(ArpesError::Rank(stack.rank()));
    }
    let ke = stack.scale(Axis::X)?;
    let theta_y = stack.scale(Axis::Y)?;
    let hv = stack.scale(Axis::Z)?;

    let (ke_min, ke_max) = min_max(ke.iter().copied());
    let (hv_min, hv_max) = min_max(hv.iter().copied());
    let (ty_min, ty_max) = min_max(theta_y.iter().copied());
    let be_new = linspace(hv_max - wk - ke_min, hv_min - wk - ke_max, ke.len());
    let (ky_min, ky_max) = min_max([
        theta_to_ky(ke_min, 0.0, ty_min),
        theta_to_ky(ke_min, 0.0, ty_max),
        theta_to_ky(ke_max, 0.0, ty_min),
        theta_to_ky(ke_max, 0.0, ty_max),
    ]);
    let ky_new = linspace(ky_min, ky_max, theta_y.len());

    let slices: Vec<Array2<f64>> = (0..hv.len())
        .into_par_iter()
        .map(|k| {
            let img = stack.data().index_axis(ndarray::Axis(2), k);
            let img = img.into_dimensionality::<Ix2>()?;
            Ok(Array2::from_shape_fn((be_new.len(), ky_new.len()), |(i, j)| {
                let e = hv[k] - wk - be_new[i];
                let ty = k_to_theta_y(e, 0.0, ky_new[j]);
                interp2d(ke.view(), theta_y.view(), img, e, ty)
            }))
        })
        .collect::<Result<_, ArpesError>>()?;
    let views: Vec<_> = slices.iter().map(|s| s.view()).collect();
    let data = ndarray::stack(ndarray::Axis(2), &views)?;

    let nd = NData::new(data)?
        .with_ax(Axis::X, ky_new, KY_UNIT)?
        .with_ax(Axis::Y, be_new, BE_UNIT)?
        .with_ax(Axis::Z, hv.clone(), stack.unit(Axis::Z))?;
    Ok(nd)
}
