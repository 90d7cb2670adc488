// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading TIFF files.

use thiserror::Error;

use crate::ndata::NDataError;

#[derive(Error, Debug)]
pub enum TiffError {
    #[error("Not a TIFF file (bad byte order mark or magic number)")]
    NotTiff,

    #[error("TIFF file is truncated: needed {len} bytes at offset {offset}")]
    Truncated { offset: usize, len: usize },

    #[error("TIFF page {page} is missing the required tag {tag}")]
    MissingTag { page: usize, tag: &'static str },

    #[error("Unsupported TIFF feature: {0}")]
    Unsupported(String),

    #[error("TIFF page {page} is {got:?} pixels, but the first page is {expected:?}")]
    PageShape {
        page: usize,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("Specified TIFF file '{0}' doesn't exist")]
    FileDoesntExist(String),

    #[error(transparent)]
    NData(#[from] NDataError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
