// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.
 */

/// Boltzmann constant \[eV/K\]
pub const KB: f64 = 8.6173423e-05;
/// Electron mass \[eV * Å^-2 * s^2\]
pub const ME: f64 = 5.68562958e-32;
/// Reduced Planck constant \[eV * s\]
pub const HBAR: f64 = 6.58211814e-16;
/// hc/e \[keV * Å\]
pub const HC_OVER_E: f64 = 12.3984193;
/// hc/e \[eV * Å\]
pub const HC_E: f64 = 1239.84193;

/// sqrt(2 * m_e) / hbar; converts sqrt(KE) \[eV^1/2\] into a wavevector
/// \[Å^-1\].
pub fn k_factor() -> f64 {
    (2.0 * ME).sqrt() / HBAR
}

/// Default photon energy given to an ARPES container \[eV\].
pub(crate) const DEFAULT_HV: f64 = 22.0;
/// Default analyser work function \[eV\].
pub(crate) const DEFAULT_WK: f64 = 4.0;
/// Default inner potential used for kz estimates \[eV\].
pub const DEFAULT_V0: f64 = 10.0;

pub(crate) const KE_UNIT: &str = "Kinetic Energy (eV)";
pub(crate) const BE_UNIT: &str = "Binding Energy (eV)";
pub(crate) const ANGLE_UNIT: &str = "Angle (deg)";
