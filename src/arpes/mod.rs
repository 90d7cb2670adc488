// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
ARPES: the [`NArpes`] container, conversions between emission angles and
crystal momentum, and stacking of analyser spectra.

Angles are in degrees, energies in eV and momenta in inverse Ångström. With
`c = sqrt(2 m_e) / hbar`:

```text
kx = c sqrt(KE) sin(thetaX)
ky = c sqrt(KE) cos(thetaX) sin(thetaY)
kz = sqrt(c^2 (KE + V0) - kx^2 - ky^2)
BE = hv + E_offset - wk - KE
```
 */

mod error;
mod kmap;
mod narpes;
mod stack;
#[cfg(test)]
mod tests;

pub use error::ArpesError;
pub use kmap::{
    kmap_scan_hv, kmap_scan_theta_x, kmapping_boundaries, kmapping_boundaries_slice,
    kmapping_stack, KBounds,
};
pub use narpes::{ArpesMetadata, NArpes};
pub use stack::{ea_escale, stack_eas, stack_escale, EnergyOffset, StackOptions};

use ndarray::prelude::*;

use crate::{constants::*, interp::interp1d, SlitDir};

pub fn theta_to_kx(ke: f64, theta_x: f64) -> f64 {
    k_factor() * ke.sqrt() * theta_x.to_radians().sin()
}

pub fn theta_to_ky(ke: f64, theta_x: f64, theta_y: f64) -> f64 {
    k_factor() * ke.sqrt() * theta_x.to_radians().cos() * theta_y.to_radians().sin()
}

/// The out-of-plane momentum of an electron emitted at `(theta_x, theta_y)`
/// with inner potential `v0`.
pub fn theta_to_kz(ke: f64, theta_x: f64, theta_y: f64, v0: f64) -> f64 {
    let kx = theta_to_kx(ke, theta_x);
    let ky = theta_to_ky(ke, theta_x, theta_y);
    k_to_kz(kx, ky, ke, v0)
}

/// NaN when the momentum can't be reached at this kinetic energy.
pub fn k_to_theta_x(ke: f64, kx: f64) -> f64 {
    (kx / (k_factor() * ke.sqrt())).asin().to_degrees()
}

pub fn k_to_theta_y(ke: f64, kx: f64, ky: f64) -> f64 {
    let k = k_factor() * ke.sqrt();
    let cos_theta_x = (kx / k).asin().cos();
    (ky / (k * cos_theta_x)).asin().to_degrees()
}

/// NaN if the in-plane momentum is larger than the total momentum inside the
/// crystal.
pub fn k_to_kz(kx: f64, ky: f64, ke: f64, v0: f64) -> f64 {
    let c = k_factor();
    let kz2 = c * c * (ke + v0) - (kx * kx + ky * ky);
    kz2.sqrt()
}

pub fn ke_to_be(ke: f64, hv: f64, wk: f64, e_offset: f64) -> f64 {
    hv + e_offset - wk - ke
}

pub fn be_to_ke(be: f64, hv: f64, wk: f64, e_offset: f64) -> f64 {
    hv + e_offset - wk - be
}

/// The thermal energy `kB T` in meV of a temperature in K.
pub fn t_k_to_mev(temp_k: f64) -> f64 {
    KB * temp_k * 1000.0
}

/// Resample an analyser image from detector angle to momentum.
///
/// `img` is (angle, KE), as spectra are loaded. For each kinetic energy
/// column, the intensity along the slit is converted to momentum (ky for a
/// vertical slit, kx for a horizontal one, where `polar_angle` is added to
/// the detector angle) and interpolated onto `k_new`. Points outside of the
/// measured range are NaN. `ke_offset` corrects for a drift of the Fermi
/// level. The result is (k, KE).
pub fn arpes_angle_k(
    k_new: &Array1<f64>,
    img: ArrayView2<f64>,
    ke_scale: &Array1<f64>,
    angle_scale: &Array1<f64>,
    polar_angle: f64,
    ke_offset: f64,
    slit: SlitDir,
) -> Array2<f64> {
    let mut out = Array2::from_elem((k_new.len(), ke_scale.len()), f64::NAN);
    let k_new = k_new.to_vec();
    for (j, &ke) in ke_scale.iter().enumerate() {
        let ke = ke + ke_offset;
        let k: Vec<f64> = angle_scale
            .iter()
            .map(|&a| match slit {
                SlitDir::H => theta_to_kx(ke, polar_angle + a),
                SlitDir::V => theta_to_ky(ke, polar_angle, a),
            })
            .collect();
        let column = img.column(j).to_vec();
        let resampled = interp1d(&k, &column, &k_new);
        out.column_mut(j).assign(&resampled);
    }
    out
}
