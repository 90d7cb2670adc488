// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Special functions used by the fit models.

/// The complementary error function, with a fractional error below 1.2e-7
/// everywhere (Chebyshev fit of `exp(z^2) erfc(z)`).
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// The error function.
pub fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn erfc_known_values() {
        assert_abs_diff_eq!(erfc(0.0), 1.0, epsilon = 1e-7);
        assert_abs_diff_eq!(erfc(0.5), 0.479_500_122_186_953_5, epsilon = 1e-7);
        assert_abs_diff_eq!(erfc(1.0), 0.157_299_207_050_285_1, epsilon = 1e-7);
        assert_abs_diff_eq!(erfc(-1.0), 1.842_700_792_949_715, epsilon = 1e-7);
        assert_abs_diff_eq!(erfc(3.0), 2.209_049_699_858_544e-5, epsilon = 1e-9);
        assert!(erfc(f64::NAN).is_nan());
    }

    #[test]
    fn erf_is_odd() {
        for x in [0.1, 0.7, 1.3, 2.2] {
            assert_abs_diff_eq!(erf(-x), -erf(x), epsilon = 1e-7);
        }
        assert_abs_diff_eq!(erf(f64::INFINITY), 1.0);
    }
}
