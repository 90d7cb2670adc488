// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The `NData` container: a 1 to 3 dimensional array kept together with its
//! axis scales, units and free-form metadata.

mod error;
mod h5;
pub mod imgproc;
pub mod stack;

pub use error::NDataError;
pub use imgproc::{rotate2d, rotate3d, rotated_coordinates, sym2d, GridSpec};
pub use stack::{
    crop, find_closest, lim_to_bounds, metadata_stack, n_append, ndstack, nstack, slice_dstack,
    val_to_idx, ScaleMode,
};

use std::collections::BTreeMap;

use ndarray::{prelude::*, Dimension};

use crate::{Axis, MetaValue};

/// An n-dimensional (1, 2 or 3) array with a coordinate scale and a unit per
/// axis, and a dictionary of metadata.
///
/// Every scale always has the same length as the data axis it labels; the
/// methods that set scales refuse to break this.
#[derive(Debug, Clone, PartialEq)]
pub struct NData {
    data: ArrayD<f64>,
    scale: BTreeMap<Axis, Array1<f64>>,
    unit: BTreeMap<Axis, String>,
    /// Metadata. Keys are free-form.
    pub extras: BTreeMap<String, MetaValue>,
}

impl NData {
    /// Wrap an array. Each axis gets an index scale (0, 1, 2, ...) and an empty
    /// unit.
    pub fn new<D: Dimension>(data: Array<f64, D>) -> Result<NData, NDataError> {
        let data = data.into_dyn();
        let rank = data.ndim();
        if !(1..=3).contains(&rank) {
            return Err(NDataError::Rank(rank));
        }

        let mut scale = BTreeMap::new();
        let mut unit = BTreeMap::new();
        for (i, &ax) in Axis::for_rank(rank).iter().enumerate() {
            scale.insert(ax, Array1::range(0.0, data.shape()[i] as f64, 1.0));
            unit.insert(ax, String::new());
        }

        Ok(NData {
            data,
            scale,
            unit,
            extras: BTreeMap::new(),
        })
    }

    /// Builder form of [`NData::update_ax`].
    pub fn with_ax<S: Into<Array1<f64>>>(
        mut self,
        ax: Axis,
        scale: S,
        unit: &str,
    ) -> Result<NData, NDataError> {
        self.update_ax(ax, scale, unit)?;
        Ok(self)
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// Mutable access to the values. The shape can't be changed through this
    /// view, so the scales stay valid.
    pub fn data_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        self.data.view_mut()
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// The axes of this data, in array order.
    pub fn axes(&self) -> &'static [Axis] {
        Axis::for_rank(self.rank())
    }

    /// The position of `ax` in the underlying array.
    pub fn array_index(&self, ax: Axis) -> Result<usize, NDataError> {
        ax.array_index(self.rank()).ok_or(NDataError::MissingAxis {
            ax,
            rank: self.rank(),
        })
    }

    /// The length of the data along `ax`.
    pub fn len_of(&self, ax: Axis) -> Result<usize, NDataError> {
        Ok(self.data.shape()[self.array_index(ax)?])
    }

    pub fn scale(&self, ax: Axis) -> Result<&Array1<f64>, NDataError> {
        self.scale.get(&ax).ok_or(NDataError::MissingAxis {
            ax,
            rank: self.rank(),
        })
    }

    /// The unit of `ax`; empty if the axis doesn't exist.
    pub fn unit(&self, ax: Axis) -> &str {
        self.unit.get(&ax).map(|s| s.as_str()).unwrap_or("")
    }

    /// Update the scale and unit of an axis.
    pub fn update_ax<S: Into<Array1<f64>>>(
        &mut self,
        ax: Axis,
        scale: S,
        unit: &str,
    ) -> Result<(), NDataError> {
        self.update_scale(ax, scale)?;
        self.unit.insert(ax, unit.to_string());
        Ok(())
    }

    /// Update the scale of an axis. The new scale must have the same length as
    /// the data axis.
    pub fn update_scale<S: Into<Array1<f64>>>(
        &mut self,
        ax: Axis,
        scale: S,
    ) -> Result<(), NDataError> {
        let scale = scale.into();
        let expected = self.len_of(ax)?;
        if scale.len() != expected {
            return Err(NDataError::ScaleLength {
                ax,
                expected,
                got: scale.len(),
            });
        }
        self.scale.insert(ax, scale);
        Ok(())
    }

    /// Shift the scale of an axis so that `old` lands on `new`.
    pub fn shift_scale(&mut self, ax: Axis, old: f64, new: f64) -> Result<(), NDataError> {
        let rank = self.rank();
        let scale = self
            .scale
            .get_mut(&ax)
            .ok_or(NDataError::MissingAxis { ax, rank })?;
        scale.mapv_inplace(|v| v - old + new);
        Ok(())
    }

    pub fn update_unit(&mut self, ax: Axis, unit: &str) -> Result<(), NDataError> {
        self.array_index(ax)?;
        self.unit.insert(ax, unit.to_string());
        Ok(())
    }

    /// Replace all of the metadata.
    pub fn update_extras(&mut self, extras: BTreeMap<String, MetaValue>) {
        self.extras = extras;
    }

    /// Insert or replace a single metadata entry.
    pub fn update_extras_by_key<V: Into<MetaValue>>(&mut self, key: &str, value: V) {
        self.extras.insert(key.to_string(), value.into());
    }

    /// A summary of the shape and axes of this data.
    pub fn info(&self) -> String {
        let mut s = format!(
            "The {}-dim data has shape {:?}",
            self.rank(),
            self.data.shape()
        );
        for &ax in [Axis::X, Axis::Y, Axis::Z].iter() {
            if let Some(scale) = self.scale.get(&ax) {
                s.push_str(&format!(
                    "\nAxis {ax}: size - {}, unit - {}",
                    scale.len(),
                    self.unit(ax)
                ));
            }
        }
        s
    }

    /// Sum along `ax`, ignoring NaNs. The result keeps the scales and units
    /// of the remaining axes, in order (e.g. summing the y of a 2D image gives
    /// a 1D curve along the image's x).
    pub fn sum_along(&self, ax: Axis) -> Result<NData, NDataError> {
        let rank = self.rank();
        if rank < 2 {
            return Err(NDataError::WrongRank {
                op: "sum_along",
                expected: "2D or 3D",
                rank,
            });
        }
        let i = self.array_index(ax)?;
        let summed = self
            .data
            .map_axis(ndarray::Axis(i), |lane| nansum(lane.iter().copied()));
        let kept: Vec<Axis> = self.axes().iter().copied().filter(|&a| a != ax).collect();
        self.relabel(summed, &kept)
    }

    /// Sum a window of `2 * width_pix` rows (or columns) of a 2D image along
    /// `ax`, ignoring NaNs. The window is centred on the scale value closest to
    /// `center`; without a centre the midpoint is used, and without a width
    /// the whole image is binned.
    pub fn avg(
        &self,
        ax: Axis,
        center: Option<f64>,
        width_pix: Option<usize>,
    ) -> Result<NData, NDataError> {
        if self.rank() != 2 {
            return Err(NDataError::WrongRank {
                op: "avg",
                expected: "2D",
                rank: self.rank(),
            });
        }
        let scale = self.scale(ax)?;
        let n = scale.len();
        let cen_pix = match center {
            Some(c) => val_to_idx(scale, c),
            None => n / 2,
        };
        let width = width_pix.unwrap_or(n / 2);
        let lo = cen_pix.saturating_sub(width);
        let hi = (cen_pix + width).min(n).max(lo + 1).min(n);

        let i = self.array_index(ax)?;
        let window = self
            .data
            .slice_axis(ndarray::Axis(i), ndarray::Slice::from(lo..hi));
        let summed = window.map_axis(ndarray::Axis(i), |lane| nansum(lane.iter().copied()));
        let other = if ax == Axis::X { Axis::Y } else { Axis::X };
        self.relabel(summed, &[other])
    }

    /// Build a new `NData` from `data`, whose dimensions correspond to the
    /// `kept` axes of `self` (in order).
    pub(crate) fn relabel(&self, data: ArrayD<f64>, kept: &[Axis]) -> Result<NData, NDataError> {
        let mut nd = NData::new(data)?;
        let new_axes = nd.axes();
        for (&new_ax, &old_ax) in new_axes.iter().zip(kept.iter()) {
            nd.update_ax(new_ax, self.scale(old_ax)?.clone(), self.unit(old_ax))?;
        }
        Ok(nd)
    }
}

/// Sum, skipping NaNs.
pub(crate) fn nansum<I: Iterator<Item = f64>>(it: I) -> f64 {
    it.filter(|v| !v.is_nan()).sum()
}
