// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Preparing line profiles for plotting: subranges, normalisation, offsets
//! and scaling.

use ndarray::prelude::*;

use crate::{
    ndata::{find_closest, NData, NDataError},
    xas::slice_range,
    Axis,
};

/// How a line is transformed before it is drawn.
///
/// The y values become `y * scale - offset` (after the optional
/// normalisation to [0, 1]) and the x values `x * scale_x + offset_x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    /// Keep only the points between the x values closest to these (end
    /// exclusive).
    pub xrange: Option<(f64, f64)>,
    pub norm_to_one: bool,
    pub offset: f64,
    /// Also subtract the mean of `y[start:stop]`.
    pub offset_mean_index: Option<(isize, isize)>,
    pub scale: f64,
    /// Also divide by the mean of `y[start:stop]`.
    pub scale_mean_index: Option<(isize, isize)>,
    pub offset_x: f64,
    pub scale_x: f64,
}

impl Default for LineOptions {
    fn default() -> Self {
        LineOptions {
            xrange: None,
            norm_to_one: false,
            offset: 0.0,
            offset_mean_index: None,
            scale: 1.0,
            scale_mean_index: None,
            offset_x: 0.0,
            scale_x: 1.0,
        }
    }
}

fn window_mean(y: &Array1<f64>, (start, stop): (isize, isize)) -> f64 {
    let r = slice_range(y.len(), start, stop);
    y.slice(s![r]).mean().unwrap_or(f64::NAN)
}

/// Apply `opts` to the line (x, y). x and y must have the same length.
pub fn prepare_line(x: &[f64], y: &[f64], opts: &LineOptions) -> (Array1<f64>, Array1<f64>) {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    let (x, y) = match opts.xrange {
        Some((lo, hi)) => {
            let i0 = find_closest(x, lo).map_or(0, |c| c.0);
            let i1 = find_closest(x, hi).map_or(0, |c| c.0).max(i0);
            (&x[i0..i1], &y[i0..i1])
        }
        None => (x, y),
    };
    let mut x = Array1::from(x.to_vec());
    let mut y = Array1::from(y.to_vec());

    if opts.norm_to_one {
        let (lo, hi) = y.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
        y.mapv_inplace(|v| (v - lo) / (hi - lo));
    }

    let mut scale = opts.scale;
    if let Some(window) = opts.scale_mean_index {
        scale /= window_mean(&y, window);
    }
    let mut offset = opts.offset;
    if let Some(window) = opts.offset_mean_index {
        offset += window_mean(&y, window);
    }

    y.mapv_inplace(|v| v * scale - offset);
    x.mapv_inplace(|v| v * opts.scale_x + opts.offset_x);
    (x, y)
}

/// [`prepare_line`] for a 1D `NData` against its x scale.
pub fn prepare_ndata_line(
    nd: &NData,
    opts: &LineOptions,
) -> Result<(Array1<f64>, Array1<f64>), NDataError> {
    if nd.rank() != 1 {
        return Err(NDataError::WrongRank {
            op: "prepare_ndata_line",
            expected: "1D",
            rank: nd.rank(),
        });
    }
    let x = nd.scale(Axis::X)?.to_vec();
    let y: Vec<f64> = nd.data().iter().copied().collect();
    Ok(prepare_line(&x, &y, opts))
}

/// Which line of a pair of 2D arrays to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Row(usize),
    Column(usize),
}

/// Reduce matching 2D coordinate arrays (as from a mesh grid) to one row or
/// column each.
pub fn reduce2d(
    x: ArrayView2<f64>,
    y: ArrayView2<f64>,
    which: Reduce,
) -> Result<(Array1<f64>, Array1<f64>), NDataError> {
    if x.shape() != y.shape() {
        return Err(NDataError::ShapeMismatch(
            x.shape().to_vec(),
            y.shape().to_vec(),
        ));
    }
    let (ax, array_ax, index) = match which {
        Reduce::Row(i) => (Axis::Y, 0, i),
        Reduce::Column(j) => (Axis::X, 1, j),
    };
    let len = x.len_of(ndarray::Axis(array_ax));
    if index >= len {
        return Err(NDataError::IndexOutOfBounds { ax, index, len });
    }
    Ok((
        x.index_axis(ndarray::Axis(array_ax), index).to_owned(),
        y.index_axis(ndarray::Axis(array_ax), index).to_owned(),
    ))
}
