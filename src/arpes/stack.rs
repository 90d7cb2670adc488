// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stacking spectra (or their EDCs) taken at different photon energies,
//! temperatures, ... onto a common energy scale.

use log::debug;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::{ke_to_be, ArpesError, NArpes};
use crate::{
    constants::{BE_UNIT, KE_UNIT},
    interp::{arange, interp1d, interp2d},
    ndata::{nstack, NData},
    Axis,
};

/// Energy offsets applied to the spectra of a stack.
#[derive(Debug, Clone, PartialEq)]
pub enum EnergyOffset {
    /// The same offset for every spectrum.
    Same(f64),
    /// One offset per spectrum.
    Each(Vec<f64>),
}

impl Default for EnergyOffset {
    fn default() -> Self {
        EnergyOffset::Same(0.0)
    }
}

impl EnergyOffset {
    /// One offset per spectrum of a stack of `n`.
    pub(crate) fn resolve(&self, n: usize) -> Result<Vec<f64>, ArpesError> {
        match self {
            EnergyOffset::Same(v) => Ok(vec![*v; n]),
            EnergyOffset::Each(v) if v.len() == n => Ok(v.clone()),
            EnergyOffset::Each(v) => Err(ArpesError::OffsetCount {
                expected: n,
                got: v.len(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackOptions {
    /// Stack only the EDCs (giving an image) rather than the whole spectra
    /// (giving a volume).
    pub edc_only: bool,
    /// Energy offsets, replacing each spectrum's own `e_offset`.
    pub e_offsets: Option<EnergyOffset>,
}

/// The energy scale and unit of a spectrum: the binding energy scale if `be`,
/// otherwise the original kinetic energy scale.
pub fn ea_escale(ea: &NArpes, be: bool) -> (Array1<f64>, &'static str) {
    if be {
        (ea.be_scale().clone(), BE_UNIT)
    } else {
        (ea.ke_scale.clone(), KE_UNIT)
    }
}

/// Like [`ea_escale`], but with a different energy offset.
fn escale_with_offset(ea: &NArpes, be: bool, e_offset: Option<f64>) -> Array1<f64> {
    match (be, e_offset) {
        (true, Some(off)) => ea.ke_scale.mapv(|ke| ke_to_be(ke, ea.hv(), ea.wk(), off)),
        _ => ea_escale(ea, be).0,
    }
}

/// An energy scale covering every spectrum of `list`, with the step of the
/// first spectrum. Binding energy scales run from high to low, kinetic energy
/// scales from low to high. Interpolating onto this scale needs NaN filling,
/// as not every spectrum covers all of it.
pub fn stack_escale(
    list: &[NArpes],
    be: bool,
    e_offsets: Option<&[f64]>,
) -> Result<(Array1<f64>, &'static str), ArpesError> {
    let first = list.first().ok_or(ArpesError::EmptyList)?;
    if let Some(offsets) = e_offsets {
        if offsets.len() != list.len() {
            return Err(ArpesError::OffsetCount {
                expected: list.len(),
                got: offsets.len(),
            });
        }
    }

    let mut e_min = f64::INFINITY;
    let mut e_max = f64::NEG_INFINITY;
    for (i, ea) in list.iter().enumerate() {
        let scale = escale_with_offset(ea, be, e_offsets.map(|o| o[i]));
        for &e in scale.iter().filter(|e| !e.is_nan()) {
            e_min = e_min.min(e);
            e_max = e_max.max(e);
        }
    }

    let first_scale = escale_with_offset(first, be, e_offsets.map(|o| o[0]));
    if first_scale.len() < 2 {
        return Err(ArpesError::ShortEnergyScale);
    }
    let step = (first_scale[1] - first_scale[0]).abs();
    if !(step.is_finite() && step > 0.0) {
        return Err(ArpesError::EnergyStep(step));
    }
    let (scale, unit) = if be {
        (arange(e_max, e_min, -step), BE_UNIT)
    } else {
        (arange(e_min, e_max, step), KE_UNIT)
    };
    debug!(
        "Stack energy scale: {} points from {e_min} to {e_max} eV",
        scale.len()
    );
    Ok((scale, unit))
}

/// Interpolate every spectrum of `list` onto a common energy scale and stack
/// them.
///
/// With `opts.edc_only`, the EDCs are stacked into an image with `y =
/// stack_scale`; otherwise the spectra are also interpolated onto the angle
/// scale of the first one and stacked into a volume with `y` the angle and
/// `z = stack_scale`. Points outside of a spectrum are NaN.
pub fn stack_eas(
    list: &[NArpes],
    stack_scale: Option<Array1<f64>>,
    stack_unit: &str,
    be: bool,
    opts: &StackOptions,
) -> Result<NData, ArpesError> {
    let first = list.first().ok_or(ArpesError::EmptyList)?;
    let offsets = opts
        .e_offsets
        .as_ref()
        .map(|o| o.resolve(list.len()))
        .transpose()?;
    let (e_scale, e_unit) = stack_escale(list, be, offsets.as_deref())?;
    let angle_scale = first.scale(Axis::Y)?.clone();

    let slices: Vec<NData> = list
        .par_iter()
        .enumerate()
        .map(|(i, ea)| {
            let x_original = escale_with_offset(ea, be, offsets.as_ref().map(|o| o[i]));
            let data: ArrayD<f64> = if opts.edc_only {
                let edc = ea.edc.data().iter().copied().collect::<Vec<_>>();
                interp1d(&x_original.to_vec(), &edc, &e_scale.to_vec()).into_dyn()
            } else {
                let y_original = ea.scale(Axis::Y)?;
                let img = ea.data().view().into_dimensionality::<Ix2>()?;
                Array2::from_shape_fn((angle_scale.len(), e_scale.len()), |(r, c)| {
                    interp2d(
                        x_original.view(),
                        y_original.view(),
                        img,
                        e_scale[c],
                        angle_scale[r],
                    )
                })
                .into_dyn()
            };
            let mut nd = NData::new(data)?;
            nd.extras = ea.extras.clone();
            Ok(nd)
        })
        .collect::<Result<_, ArpesError>>()?;

    let mut nd = nstack(&slices, stack_scale, stack_unit)?;
    nd.update_ax(Axis::X, e_scale, e_unit)?;
    if !opts.edc_only {
        nd.update_ax(Axis::Y, angle_scale, "Degree")?;
    }
    Ok(nd)
}
