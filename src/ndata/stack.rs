// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Stacking, appending, cropping and slicing of [`NData`].

use std::collections::BTreeMap;

use ndarray::{concatenate, prelude::*, stack, Slice};

use super::{NData, NDataError};
use crate::{Axis, MetaValue};

/// How [`n_append`] scales the appended axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Concatenate the scales of both data sets.
    #[default]
    Data,
    /// Use the point number.
    Point,
}

/// The index of the value in `x` closest to `val`. NaNs in `x` are skipped.
/// Returns 0 if `x` has no comparable values.
pub fn val_to_idx(x: &Array1<f64>, val: f64) -> usize {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, &v) in x.iter().enumerate() {
        let diff = (v - val).powi(2);
        // Strictly less than; the first of two equally close points wins.
        if diff < best_diff {
            best_diff = diff;
            best = i;
        }
    }
    best
}

/// The index and value of the element of `x` closest to `val`.
pub fn find_closest(x: &[f64], val: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    let mut best_diff = f64::INFINITY;
    for (i, &v) in x.iter().enumerate() {
        let diff = (val - v).abs();
        if diff < best_diff {
            best_diff = diff;
            best = Some((i, v));
        }
    }
    best
}

/// Convert a range of values `[lo, hi]` (in either order) into the
/// (ascending) indices of the closest elements of `x`.
pub fn lim_to_bounds(x: &Array1<f64>, lo: f64, hi: f64) -> (usize, usize) {
    let i0 = val_to_idx(x, lo);
    let i1 = val_to_idx(x, hi);
    let last = x.len().saturating_sub(1);
    (i0.min(i1).min(last), i0.max(i1).min(last))
}

/// Crop `d` along `ax` to the values `[lo, hi]`. Both ends are kept.
pub fn crop(d: &NData, ax: Axis, lo: f64, hi: f64) -> Result<NData, NDataError> {
    let (imin, imax) = lim_to_bounds(d.scale(ax)?, lo, hi);
    crop_index(d, ax, imin, imax + 1)
}

/// Crop `d` along `ax` to the index range `start..end`.
pub(crate) fn crop_index(
    d: &NData,
    ax: Axis,
    start: usize,
    end: usize,
) -> Result<NData, NDataError> {
    let i = d.array_index(ax)?;
    let len = d.shape()[i];
    if start >= len || end > len {
        return Err(NDataError::IndexOutOfBounds {
            ax,
            index: end.max(start),
            len,
        });
    }
    let data = d
        .data()
        .slice_axis(ndarray::Axis(i), Slice::from(start..end))
        .to_owned();
    let mut c = NData::new(data)?;
    for &a in d.axes() {
        let scale = d.scale(a)?;
        if a == ax {
            c.update_ax(a, scale.slice(s![start..end]).to_owned(), d.unit(a))?;
        } else {
            c.update_ax(a, scale.clone(), d.unit(a))?;
        }
    }
    c.extras = d.extras.clone();
    Ok(c)
}

impl NData {
    pub fn crop_x(&self, lo: f64, hi: f64) -> Result<NData, NDataError> {
        crop(self, Axis::X, lo, hi)
    }

    pub fn crop_y(&self, lo: f64, hi: f64) -> Result<NData, NDataError> {
        crop(self, Axis::Y, lo, hi)
    }

    pub fn crop_z(&self, lo: f64, hi: f64) -> Result<NData, NDataError> {
        crop(self, Axis::Z, lo, hi)
    }
}

fn default_stack_scale(n: usize, start: f64) -> Array1<f64> {
    Array1::from_iter((0..n).map(|i| start + i as f64))
}

fn check_stack_scale(scale: &Array1<f64>, expected: usize, ax: Axis) -> Result<(), NDataError> {
    if scale.len() == expected {
        Ok(())
    } else {
        Err(NDataError::ScaleLength {
            ax,
            expected,
            got: scale.len(),
        })
    }
}

/// Stack a list of `NData`, where the first element is the base.
///
/// * 1D curves are stacked along y into an image;
/// * 2D images are stacked along z into a volume;
/// * a 2D base followed by 1D curves gets the curves appended as new rows;
/// * a 3D base followed by 2D images gets the images appended along z.
///
/// `stack_scale` holds one value per new row/slice; when it isn't given, the
/// new slices are numbered from 1 (or onwards from the base's last scale
/// value when appending to a base). The metadata of all elements is
/// collected with [`metadata_stack`].
pub fn nstack(
    list: &[NData],
    stack_scale: Option<Array1<f64>>,
    stack_unit: &str,
) -> Result<NData, NDataError> {
    let base = list.first().ok_or(NDataError::EmptyStack)?;
    let base_rank = base.rank();
    let rest_rank = list.get(1).map(|d| d.rank()).unwrap_or(base_rank);

    for d in list.iter().skip(1) {
        if d.rank() != rest_rank {
            return Err(NDataError::StackRank {
                base: rest_rank,
                got: d.rank(),
            });
        }
    }

    let mut nd = if rest_rank == base_rank {
        if base_rank == 3 {
            return Err(NDataError::StackRank { base: 3, got: 3 });
        }
        stack_uniform(list, stack_scale, stack_unit)?
    } else if rest_rank + 1 == base_rank {
        append_to_base(list, stack_scale)?
    } else {
        return Err(NDataError::StackRank {
            base: base_rank,
            got: rest_rank,
        });
    };

    metadata_stack(list, &mut nd);
    Ok(nd)
}

/// All elements have the same rank (1 or 2); the result has one more
/// dimension.
fn stack_uniform(
    list: &[NData],
    stack_scale: Option<Array1<f64>>,
    stack_unit: &str,
) -> Result<NData, NDataError> {
    let base = &list[0];
    for d in list.iter().skip(1) {
        if d.shape() != base.shape() {
            return Err(NDataError::ShapeMismatch(
                base.shape().to_vec(),
                d.shape().to_vec(),
            ));
        }
    }
    let n = list.len();
    let stack_scale = stack_scale.unwrap_or_else(|| default_stack_scale(n, 1.0));
    let views: Vec<_> = list.iter().map(|d| d.data().view()).collect();

    if base.rank() == 1 {
        let data = stack(ndarray::Axis(0), &views)?;
        check_stack_scale(&stack_scale, n, Axis::Y)?;
        NData::new(data)?
            .with_ax(Axis::X, base.scale(Axis::X)?.clone(), base.unit(Axis::X))?
            .with_ax(Axis::Y, stack_scale, stack_unit)
    } else {
        // Images go along the last dimension.
        let data = stack(ndarray::Axis(2), &views)?;
        check_stack_scale(&stack_scale, n, Axis::Z)?;
        NData::new(data)?
            .with_ax(Axis::X, base.scale(Axis::X)?.clone(), base.unit(Axis::X))?
            .with_ax(Axis::Y, base.scale(Axis::Y)?.clone(), base.unit(Axis::Y))?
            .with_ax(Axis::Z, stack_scale, stack_unit)
    }
}

/// The base has one more dimension than the rest, which are appended to it.
fn append_to_base(list: &[NData], stack_scale: Option<Array1<f64>>) -> Result<NData, NDataError> {
    let base = &list[0];
    let (new_ax, array_ax) = match base.rank() {
        2 => (Axis::Y, 0),
        3 => (Axis::Z, 2),
        r => return Err(NDataError::StackRank { base: r, got: r - 1 }),
    };

    let mut views = vec![base.data().view()];
    for d in list.iter().skip(1) {
        let expected: Vec<usize> = base
            .shape()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != array_ax)
            .map(|(_, &s)| s)
            .collect();
        if d.shape() != expected.as_slice() {
            return Err(NDataError::ShapeMismatch(expected, d.shape().to_vec()));
        }
        views.push(d.data().view().insert_axis(ndarray::Axis(array_ax)));
    }
    let data = concatenate(ndarray::Axis(array_ax), &views)?;

    let base_scale = base.scale(new_ax)?;
    let n_new = list.len() - 1;
    let new_scale = match stack_scale {
        Some(s) => {
            check_stack_scale(&s, n_new, new_ax)?;
            s
        }
        None => {
            let start = base_scale.iter().next_back().map(|&v| v + 1.0).unwrap_or(0.0);
            default_stack_scale(n_new, start)
        }
    };
    let full_scale = concatenate(ndarray::Axis(0), &[base_scale.view(), new_scale.view()])?;

    let mut nd = NData::new(data)?;
    for &a in base.axes() {
        if a == new_ax {
            nd.update_ax(a, full_scale.clone(), base.unit(a))?;
        } else {
            nd.update_ax(a, base.scale(a)?.clone(), base.unit(a))?;
        }
    }
    Ok(nd)
}

/// Stack 2D images into a volume along z.
pub fn ndstack(
    list: &[NData],
    z_scale: Option<Array1<f64>>,
    z_unit: &str,
) -> Result<NData, NDataError> {
    if let Some(d) = list.iter().find(|d| d.rank() != 2) {
        return Err(NDataError::WrongRank {
            op: "ndstack",
            expected: "2D",
            rank: d.rank(),
        });
    }
    nstack(list, z_scale, z_unit)
}

/// Collect the metadata of every element of `list` into `stacked`: each key
/// becomes a list of the values of the elements that have it.
pub fn metadata_stack(list: &[NData], stacked: &mut NData) {
    let mut collected: BTreeMap<String, Vec<MetaValue>> = BTreeMap::new();
    for d in list {
        for (k, v) in d.extras.iter() {
            collected.entry(k.clone()).or_default().push(v.clone());
        }
    }
    for (k, v) in collected {
        stacked.extras.insert(k, MetaValue::List(v));
    }
}

/// Append `b` to `a` along `ax`.
///
/// Both must be 2D or 3D. Two images appended along x or y give an image;
/// otherwise 2D data is treated as a single-slice volume. The other axes must
/// have the same lengths, and keep the scales of `a`.
pub fn n_append(a: &NData, b: &NData, ax: Axis, mode: ScaleMode) -> Result<NData, NDataError> {
    for d in [a, b] {
        if d.rank() < 2 {
            return Err(NDataError::WrongRank {
                op: "n_append",
                expected: "2D or 3D",
                rank: d.rank(),
            });
        }
    }

    let promote = a.rank() == 3 || b.rank() == 3 || ax == Axis::Z;
    let (va, vb) = if promote {
        (as_volume(a), as_volume(b))
    } else {
        (a.data().view(), b.data().view())
    };
    let rank = va.ndim();
    let i = ax.array_index(rank).ok_or(NDataError::MissingAxis { ax, rank })?;
    for (j, (&sa, &sb)) in va.shape().iter().zip(vb.shape()).enumerate() {
        if j != i && sa != sb {
            return Err(NDataError::ShapeMismatch(
                va.shape().to_vec(),
                vb.shape().to_vec(),
            ));
        }
    }
    let data = concatenate(ndarray::Axis(i), &[va, vb])?;
    let total = data.shape()[i];

    let mut nd = NData::new(data)?;
    for &axis in nd.axes() {
        let scale_of = |d: &NData| -> Array1<f64> {
            d.scale(axis)
                .cloned()
                .unwrap_or_else(|_| Array1::zeros(1))
        };
        let scale = if axis == ax {
            match mode {
                ScaleMode::Data => {
                    concatenate(ndarray::Axis(0), &[scale_of(a).view(), scale_of(b).view()])?
                }
                ScaleMode::Point => default_stack_scale(total, 0.0),
            }
        } else {
            scale_of(a)
        };
        nd.update_ax(axis, scale, a.unit(axis))?;
    }
    nd.extras = a.extras.clone();
    nd.update_extras_by_key(
        "nDataAppend",
        vec![MetaValue::from("data1"), MetaValue::from("data2")],
    );
    Ok(nd)
}

fn as_volume(d: &NData) -> ArrayViewD<'_, f64> {
    if d.rank() == 2 {
        d.data().view().insert_axis(ndarray::Axis(2))
    } else {
        d.data().view()
    }
}

/// A 2D slice of a volume at the position along `ax` closest to `value`.
pub fn slice_dstack(d: &NData, ax: Axis, value: f64) -> Result<NData, NDataError> {
    let index = val_to_idx(d.scale(ax)?, value);
    d.slice_dstack_index(ax, index)
}

impl NData {
    /// A 2D slice of a volume at `index` along `ax`. The remaining axes keep
    /// their order, so slicing along z gives the (y, x) image.
    pub fn slice_dstack_index(&self, ax: Axis, index: usize) -> Result<NData, NDataError> {
        if self.rank() != 3 {
            return Err(NDataError::WrongRank {
                op: "slice_dstack",
                expected: "3D",
                rank: self.rank(),
            });
        }
        let i = self.array_index(ax)?;
        let len = self.shape()[i];
        if index >= len {
            return Err(NDataError::IndexOutOfBounds { ax, index, len });
        }
        let img = self.data().index_axis(ndarray::Axis(i), index).to_owned();
        let kept: Vec<Axis> = self.axes().iter().copied().filter(|&a| a != ax).collect();
        let mut nd = self.relabel(img, &kept)?;
        nd.extras = self.extras.clone();
        Ok(nd)
    }
}
