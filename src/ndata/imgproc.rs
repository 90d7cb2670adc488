// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Rotation and rotational symmetrisation of images.

Rotations are counter-clockwise in the plane of an image, about a centre given
in scale units. A point `(h, v)` moves to

```text
h' = cos(a) (h - h0) - sin(a) (v - v0) + h0
v' = sin(a) (h - h0) + cos(a) (v - v0) + v0
```

The rotated image is resampled onto a regular grid with bilinear
interpolation; grid points with no data behind them are NaN.
 */

use ndarray::prelude::*;
use rayon::prelude::*;

use super::{NData, NDataError};
use crate::{
    interp::{interp2d, linspace},
    Axis,
};

/// A regular grid of `n` points from `min` to `max` (inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl GridSpec {
    pub fn new(min: f64, max: f64, n: usize) -> GridSpec {
        GridSpec { min, max, n }
    }

    pub fn values(&self) -> Array1<f64> {
        linspace(self.min, self.max, self.n)
    }
}

/// The coordinates of every pixel of a 2D image after rotating the image by
/// `ccw_deg` about `center` (x, y). The data itself isn't touched; the
/// returned meshes have the shape of the image.
pub fn rotated_coordinates(
    d: &NData,
    ccw_deg: f64,
    center: (f64, f64),
) -> Result<(Array2<f64>, Array2<f64>), NDataError> {
    require_2d(d, "rotated_coordinates")?;
    let xs = d.scale(Axis::X)?;
    let ys = d.scale(Axis::Y)?;
    Ok(rotate_mesh(xs, ys, ccw_deg, center))
}

fn rotate_mesh(
    hs: &Array1<f64>,
    vs: &Array1<f64>,
    ccw_deg: f64,
    (h0, v0): (f64, f64),
) -> (Array2<f64>, Array2<f64>) {
    let (s, c) = ccw_deg.to_radians().sin_cos();
    let shape = (vs.len(), hs.len());
    let rot_h = Array2::from_shape_fn(shape, |(i, j)| {
        c * (hs[j] - h0) - s * (vs[i] - v0) + h0
    });
    let rot_v = Array2::from_shape_fn(shape, |(i, j)| {
        s * (hs[j] - h0) + c * (vs[i] - v0) + v0
    });
    (rot_h, rot_v)
}

/// The default output grid along one direction: the extent of the rotated
/// coordinates, with the step of the original scale.
fn bounding_grid(rotated: &Array2<f64>, original: &Array1<f64>) -> GridSpec {
    let min = rotated.iter().copied().fold(f64::INFINITY, f64::min);
    let max = rotated.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = if original.len() > 1 {
        (original[1] - original[0]).abs()
    } else {
        0.0
    };
    let n = if step > 0.0 && max > min {
        ((max - min) / step + 1e-9) as usize + 1
    } else {
        1
    };
    GridSpec { min, max, n }
}

/// Rotate `img` (rows along `vs`, columns along `hs`) and sample it on the
/// `hgrid` x `vgrid` grid.
fn rotate_onto(
    img: ArrayView2<f64>,
    hs: &Array1<f64>,
    vs: &Array1<f64>,
    ccw_deg: f64,
    (h0, v0): (f64, f64),
    new_h: &Array1<f64>,
    new_v: &Array1<f64>,
) -> Array2<f64> {
    let (s, c) = ccw_deg.to_radians().sin_cos();
    Array2::from_shape_fn((new_v.len(), new_h.len()), |(i, j)| {
        // Undo the rotation to find where this grid point came from.
        let dh = new_h[j] - h0;
        let dv = new_v[i] - v0;
        let h = c * dh + s * dv + h0;
        let v = -s * dh + c * dv + v0;
        interp2d(hs.view(), vs.view(), img, h, v)
    })
}

/// Resolve the output grids of a rotation, falling back on the bounding box
/// of the rotated image.
fn output_grids(
    hs: &Array1<f64>,
    vs: &Array1<f64>,
    ccw_deg: f64,
    center: (f64, f64),
    new_hscale: Option<GridSpec>,
    new_vscale: Option<GridSpec>,
) -> (Array1<f64>, Array1<f64>) {
    let (rot_h, rot_v) = rotate_mesh(hs, vs, ccw_deg, center);
    let hgrid = new_hscale.unwrap_or_else(|| bounding_grid(&rot_h, hs));
    let vgrid = new_vscale.unwrap_or_else(|| bounding_grid(&rot_v, vs));
    (hgrid.values(), vgrid.values())
}

/// Rotate a 2D image counter-clockwise by `ccw_deg` about `center` (x, y).
///
/// The new x and y scales default to the extent of the rotated image with the
/// original steps; `[min, max, n]` grids can be given instead.
pub fn rotate2d(
    d: &NData,
    ccw_deg: f64,
    center: (f64, f64),
    new_hscale: Option<GridSpec>,
    new_vscale: Option<GridSpec>,
) -> Result<NData, NDataError> {
    require_2d(d, "rotate2d")?;
    let xs = d.scale(Axis::X)?;
    let ys = d.scale(Axis::Y)?;
    let (new_x, new_y) = output_grids(xs, ys, ccw_deg, center, new_hscale, new_vscale);
    let img = d.data().view().into_dimensionality::<Ix2>()?;
    let rotated = rotate_onto(img, xs, ys, ccw_deg, center, &new_x, &new_y);

    NData::new(rotated)?
        .with_ax(Axis::X, new_x, d.unit(Axis::X))?
        .with_ax(Axis::Y, new_y, d.unit(Axis::Y))
}

/// The (horizontal, vertical) axes of the slices of a volume normal to `ax`.
fn slice_axes(ax: Axis) -> (Axis, Axis) {
    match ax {
        Axis::Z => (Axis::X, Axis::Y),
        Axis::Y => (Axis::X, Axis::Z),
        Axis::X => (Axis::Y, Axis::Z),
    }
}

/// Rotate every slice of a volume normal to `ax` by `ccw_deg` about `center`.
///
/// | `ax` | horizontal | vertical |
/// |------|------------|----------|
/// | z    | x          | y        |
/// | y    | x          | z        |
/// | x    | y          | z        |
///
/// `center`, `new_hscale` and `new_vscale` follow the table. The grid is
/// worked out from the first slice and shared by all of them.
pub fn rotate3d(
    d: &NData,
    ax: Axis,
    ccw_deg: f64,
    center: (f64, f64),
    new_hscale: Option<GridSpec>,
    new_vscale: Option<GridSpec>,
) -> Result<NData, NDataError> {
    if d.rank() != 3 {
        return Err(NDataError::WrongRank {
            op: "rotate3d",
            expected: "3D",
            rank: d.rank(),
        });
    }
    let (h_ax, v_ax) = slice_axes(ax);
    // Slices normal to x or y are stored (horizontal, vertical).
    let transposed = ax != Axis::Z;
    let hs = d.scale(h_ax)?;
    let vs = d.scale(v_ax)?;
    let (new_h, new_v) = output_grids(hs, vs, ccw_deg, center, new_hscale, new_vscale);

    let i = d.array_index(ax)?;
    let n = d.shape()[i];
    let slices: Vec<Array2<f64>> = (0..n)
        .into_par_iter()
        .map(|k| {
            let img = d.data().index_axis(ndarray::Axis(i), k);
            let mut img = img.into_dimensionality::<Ix2>()?;
            if transposed {
                img = img.reversed_axes();
            }
            let rotated = rotate_onto(img, hs, vs, ccw_deg, center, &new_h, &new_v);
            Ok(if transposed {
                rotated.reversed_axes()
            } else {
                rotated
            })
        })
        .collect::<Result<_, NDataError>>()?;
    let views: Vec<_> = slices.iter().map(|s| s.view()).collect();
    let data = ndarray::stack(ndarray::Axis(i), &views)?;

    let mut nd = NData::new(data)?;
    nd.update_ax(ax, d.scale(ax)?.clone(), d.unit(ax))?;
    nd.update_ax(h_ax, new_h, d.unit(h_ax))?;
    nd.update_ax(v_ax, new_v, d.unit(v_ax))?;
    Ok(nd)
}

/// `nfold` rotational symmetrisation of a 2D image about `center` (x, y).
///
/// The image is rotated by every multiple of `360 / nfold` degrees onto the
/// given grids, and the rotations are averaged; pixels without data in some
/// rotations are averaged over the rotations that have them. `nfold = 2` is an
/// inversion, not a mirror.
pub fn sym2d(
    d: &NData,
    nfold: usize,
    center: (f64, f64),
    hscale: GridSpec,
    vscale: GridSpec,
) -> Result<NData, NDataError> {
    require_2d(d, "sym2d")?;
    if nfold < 2 {
        return Err(NDataError::Symmetry(nfold));
    }
    let xs = d.scale(Axis::X)?;
    let ys = d.scale(Axis::Y)?;
    let new_x = hscale.values();
    let new_y = vscale.values();
    let img = d.data().view().into_dimensionality::<Ix2>()?;

    let shape = (new_y.len(), new_x.len());
    let mut sum = Array2::<f64>::zeros(shape);
    let mut count = Array2::<f64>::zeros(shape);
    for k in 0..nfold {
        let deg = 360.0 / nfold as f64 * k as f64;
        let rotated = rotate_onto(img, xs, ys, deg, center, &new_x, &new_y);
        ndarray::Zip::from(&mut sum)
            .and(&mut count)
            .and(&rotated)
            .for_each(|s, c, &r| {
                if !r.is_nan() {
                    *s += r;
                    *c += 1.0;
                }
            });
    }
    let avg = ndarray::Zip::from(&sum)
        .and(&count)
        .map_collect(|&s, &c| if c > 0.0 { s / c } else { f64::NAN });

    let mut nd = NData::new(avg)?
        .with_ax(Axis::X, new_x, d.unit(Axis::X))?
        .with_ax(Axis::Y, new_y, d.unit(Axis::Y))?;
    nd.extras = d.extras.clone();
    Ok(nd)
}

fn require_2d(d: &NData, op: &'static str) -> Result<(), NDataError> {
    if d.rank() == 2 {
        Ok(())
    } else {
        Err(NDataError::WrongRank {
            op,
            expected: "2D",
            rank: d.rank(),
        })
    }
}

impl NData {
    /// See [`rotate2d`].
    pub fn rotate(&self, ccw_deg: f64, center: (f64, f64)) -> Result<NData, NDataError> {
        rotate2d(self, ccw_deg, center, None, None)
    }
}
