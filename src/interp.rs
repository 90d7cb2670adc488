// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Linear interpolation and grid helpers.

Points outside of the sampled range are NaN; nothing is extrapolated.
 */

use ndarray::prelude::*;

/// `n` evenly spaced values from `start` to `stop` (inclusive).
pub fn linspace(start: f64, stop: f64, n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => array![start],
        _ => Array1::linspace(start, stop, n),
    }
}

/// Values from `start` towards `stop` (exclusive) in steps of `step`. `step`
/// may be negative.
pub fn arange(start: f64, stop: f64, step: f64) -> Array1<f64> {
    if step == 0.0 || !step.is_finite() {
        return Array1::zeros(0);
    }
    let n = ((stop - start) / step).ceil();
    if !(n > 0.0) {
        return Array1::zeros(0);
    }
    Array1::from_iter((0..n as usize).map(|i| start + step * i as f64))
}

/// Find where `v` falls on a monotonic (ascending or descending) axis.
///
/// Returns the lower index of the bracketing pair and the fractional
/// distance towards the next point, or `None` if `v` is outside the axis.
pub(crate) fn locate(axis: ArrayView1<f64>, v: f64) -> Option<(usize, f64)> {
    let n = axis.len();
    if n == 0 || v.is_nan() {
        return None;
    }
    if n == 1 {
        return if axis[0] == v { Some((0, 0.0)) } else { None };
    }
    let ascending = axis[n - 1] >= axis[0];
    let (lo, hi) = if ascending {
        (axis[0], axis[n - 1])
    } else {
        (axis[n - 1], axis[0])
    };
    if v < lo || v > hi {
        return None;
    }

    // Binary search for the last index whose value is "before" v.
    let before = |x: f64| if ascending { x <= v } else { x >= v };
    let (mut a, mut b) = (0, n - 1);
    while b - a > 1 {
        let mid = (a + b) / 2;
        if before(axis[mid]) {
            a = mid;
        } else {
            b = mid;
        }
    }
    let span = axis[b] - axis[a];
    let t = if span == 0.0 { 0.0 } else { (v - axis[a]) / span };
    Some((a, t))
}

/// Linear interpolation of `(x, y)` at `x_new`. `x` doesn't need to be
/// sorted. NaN outside the range of `x`.
pub fn interp1d(x: &[f64], y: &[f64], x_new: &[f64]) -> Array1<f64> {
    let mut pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(xi, _)| !xi.is_nan())
        .map(|(&xi, &yi)| (xi, yi))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let xs: Array1<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();

    x_new
        .iter()
        .map(|&v| match locate(xs.view(), v) {
            Some((i, t)) if t == 0.0 => ys[i],
            Some((i, t)) => ys[i] * (1.0 - t) + ys[i + 1] * t,
            None => f64::NAN,
        })
        .collect()
}

/// Bilinear interpolation of an image sampled on a regular grid. `img` has
/// rows along `ys` and columns along `xs`. NaN outside the grid.
pub fn interp2d(xs: ArrayView1<f64>, ys: ArrayView1<f64>, img: ArrayView2<f64>, x: f64, y: f64) -> f64 {
    let (Some((i, ty)), Some((j, tx))) = (locate(ys, y), locate(xs, x)) else {
        return f64::NAN;
    };
    let i1 = (i + 1).min(ys.len() - 1);
    let j1 = (j + 1).min(xs.len() - 1);
    let top = lerp(img[[i, j]], img[[i, j1]], tx);
    let bottom = lerp(img[[i1, j]], img[[i1, j1]], tx);
    lerp(top, bottom, ty)
}

/// Trilinear interpolation of a volume sampled on a regular grid, with
/// `vol[[a, b, c]]` at `(axes.0[a], axes.1[b], axes.2[c])`.
pub fn interp3d(
    axes: (ArrayView1<f64>, ArrayView1<f64>, ArrayView1<f64>),
    vol: ArrayView3<f64>,
    p: (f64, f64, f64),
) -> f64 {
    let (Some((a, ta)), Some((b, tb)), Some((c, tc))) =
        (locate(axes.0, p.0), locate(axes.1, p.1), locate(axes.2, p.2))
    else {
        return f64::NAN;
    };
    let a1 = (a + 1).min(axes.0.len() - 1);
    let b1 = (b + 1).min(axes.1.len() - 1);
    let c1 = (c + 1).min(axes.2.len() - 1);
    let plane = |a: usize| {
        let front = lerp(vol[[a, b, c]], vol[[a, b, c1]], tc);
        let back = lerp(vol[[a, b1, c]], vol[[a, b1, c1]], tc);
        lerp(front, back, tb)
    };
    lerp(plane(a), plane(a1), ta)
}

/// Linear interpolation between `a` and `b`. An exact hit on `a` doesn't
/// pick up a NaN from `b`.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t == 0.0 {
        a
    } else if t == 1.0 {
        b
    } else {
        a * (1.0 - t) + b * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn test_arange() {
        assert_abs_diff_eq!(arange(0.0, 1.0, 0.25), array![0.0, 0.25, 0.5, 0.75]);
        assert_abs_diff_eq!(arange(3.0, 1.0, -1.0), array![3.0, 2.0]);
        assert_eq!(arange(0.0, 1.0, -1.0).len(), 0);
    }

    #[test]
    fn test_linspace_edges() {
        assert_eq!(linspace(0.0, 1.0, 0).len(), 0);
        assert_abs_diff_eq!(linspace(2.0, 5.0, 1), array![2.0]);
        assert_abs_diff_eq!(linspace(0.0, 1.0, 3), array![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_locate_descending() {
        let axis = array![4.0, 3.0, 2.0, 1.0];
        let (i, t) = locate(axis.view(), 2.5).unwrap();
        assert_eq!(i, 1);
        assert_abs_diff_eq!(t, 0.5);
        assert!(locate(axis.view(), 4.5).is_none());
    }

    #[test]
    fn test_interp1d_fills_nan_outside() {
        let x = [0.0, 1.0, 2.0];
        let y = [0.0, 10.0, 20.0];
        let result = interp1d(&x, &y, &[-1.0, 0.5, 2.0, 3.0]);
        assert!(result[0].is_nan());
        assert_abs_diff_eq!(result[1], 5.0);
        assert_abs_diff_eq!(result[2], 20.0);
        assert!(result[3].is_nan());
    }

    #[test]
    fn test_interp1d_descending_input() {
        let x = [2.0, 1.0, 0.0];
        let y = [20.0, 10.0, 0.0];
        let result = interp1d(&x, &y, &[0.25, 1.75]);
        assert_abs_diff_eq!(result, array![2.5, 17.5], epsilon = 1e-12);
    }

    #[test]
    fn test_interp2d_plane() {
        // z = x + 10 y is reproduced exactly by bilinear interpolation.
        let xs = array![0.0, 1.0, 2.0];
        let ys = array![0.0, 1.0];
        let img = Array2::from_shape_fn((2, 3), |(i, j)| xs[j] + 10.0 * ys[i]);
        let v = interp2d(xs.view(), ys.view(), img.view(), 1.5, 0.25);
        assert_abs_diff_eq!(v, 4.0, epsilon = 1e-12);
        assert!(interp2d(xs.view(), ys.view(), img.view(), 2.5, 0.0).is_nan());
    }

    #[test]
    fn test_interp3d_linear_function() {
        let a = array![0.0, 1.0];
        let b = array![0.0, 2.0];
        let c = array![0.0, 1.0, 2.0];
        let vol = Array3::from_shape_fn((2, 2, 3), |(i, j, k)| a[i] + b[j] * 2.0 + c[k] * 3.0);
        let v = interp3d((a.view(), b.view(), c.view()), vol.view(), (0.5, 1.0, 1.5));
        assert_abs_diff_eq!(v, 0.5 + 2.0 + 4.5, epsilon = 1e-12);
    }
}
