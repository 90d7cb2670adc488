// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with nData containers.

use thiserror::Error;

use crate::Axis;

#[derive(Error, Debug)]
pub enum NDataError {
    #[error("nData only holds 1, 2 or 3 dimensional data; got {0} dimensions")]
    Rank(usize),

    #[error("Axis '{ax}' doesn't exist for {rank}-dimensional data")]
    MissingAxis { ax: Axis, rank: usize },

    /// A scale didn't have the same length as the data axis it labels.
    #[error("Dimension {ax} mismatch! Expected {expected} scale values, but got {got}")]
    ScaleLength { ax: Axis, expected: usize, got: usize },

    #[error("Cannot stack an empty list of nData")]
    EmptyStack,

    #[error("Cannot stack {got}-dimensional data onto {base}-dimensional data")]
    StackRank { base: usize, got: usize },

    #[error("Shapes don't match when combining data: {0:?} and {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    #[error("{op} only works for {expected} data; got {rank} dimensions")]
    WrongRank {
        op: &'static str,
        expected: &'static str,
        rank: usize,
    },

    #[error("Index {index} is out of bounds for axis '{ax}' of length {len}")]
    IndexOutOfBounds { ax: Axis, index: usize, len: usize },

    #[error("A scale must have at least one finite value")]
    EmptyScale,

    #[error("{0}-fold symmetry is invalid")]
    Symmetry(usize),

    #[error("Specified nData file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error("nData file is missing '{0}'")]
    MissingMember(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// An error associated with the hdf5 crate.
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
