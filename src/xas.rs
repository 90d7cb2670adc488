// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! X-ray absorption helpers.

use std::ops::Range;

use log::debug;
use ndarray::prelude::*;

use crate::ndata::find_closest;

/// A range of points used to average the signal before or after an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeRange {
    /// A half-open range of indices; negative indices count from the end.
    Index(isize, isize),
    /// The points between the x values closest to these (end exclusive).
    Value(f64, f64),
}

impl EdgeRange {
    pub const DEFAULT_PRE_EDGE: EdgeRange = EdgeRange::Index(1, 6);
    pub const DEFAULT_POST_EDGE: EdgeRange = EdgeRange::Index(-6, -1);

    fn indices(self, x: &[f64]) -> Range<usize> {
        match self {
            EdgeRange::Index(start, stop) => slice_range(x.len(), start, stop),
            EdgeRange::Value(lo, hi) => {
                let i0 = find_closest(x, lo).map_or(0, |c| c.0);
                let i1 = find_closest(x, hi).map_or(0, |c| c.0);
                i0..i1.max(i0)
            }
        }
    }
}

/// The indices of `[start:stop]` into a sequence of `len` elements, counting
/// negative indices from the end and clamping to the sequence.
pub(crate) fn slice_range(len: usize, start: isize, stop: isize) -> Range<usize> {
    let resolve = |i: isize| -> usize {
        if i < 0 {
            len.saturating_sub(i.unsigned_abs())
        } else {
            (i as usize).min(len)
        }
    };
    let (a, b) = (resolve(start), resolve(stop));
    a..b.max(a)
}

fn mean_of(y: &[f64], r: Range<usize>) -> f64 {
    let s = &y[r.start.min(y.len())..r.end.min(y.len())];
    s.iter().sum::<f64>() / s.len() as f64
}

/// Normalise an absorption edge: subtract the pre-edge average and divide by
/// the edge jump, so the pre-edge sits at 0 and the post-edge at 1.
///
/// When the signal falls across the edge (`y[0] >= y[last]`), the post-edge
/// average is subtracted instead and the result negated, so the pre-edge
/// sits at -1 and the post-edge at 0. An empty range gives NaN.
pub fn norm_to_edge(x: &[f64], y: &[f64], pre_edge: EdgeRange, post_edge: EdgeRange) -> Array1<f64> {
    if y.is_empty() {
        return Array1::zeros(0);
    }
    let pre = pre_edge.indices(x);
    let post = post_edge.indices(x);
    debug!("Edge ranges: pre {pre:?}, post {post:?}");

    let rising = y[0] < y[y.len() - 1];
    let (base, jump, sign) = if rising {
        (pre, post, 1.0)
    } else {
        (post, pre, -1.0)
    };
    let base_mean = mean_of(y, base);
    let shifted: Vec<f64> = y.iter().map(|v| v - base_mean).collect();
    let edge = mean_of(&shifted, jump);
    debug!("Edge jump: {edge}");
    Array1::from(shifted) * sign / edge
}
