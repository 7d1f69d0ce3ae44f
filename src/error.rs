// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types for loading and mutating flame definitions.
//!
//! Nothing inside a frame's hot loop can fail; every error here comes
//! from a mutating call or a load, and is raised before any state is
//! touched.

use thiserror::Error;

/// Everything that can go wrong when building or loading a flame.
#[derive(Debug, Error)]
pub enum FlameError {
    /// A variation name or numeric id that doesn't resolve to one of
    /// the known variations.
    #[error("unknown variation: {0}")]
    UnknownVariation(String),

    /// A fixed-capacity collection would grow beyond its maximum.
    #[error("{what} capacity exceeded (maximum {max})")]
    CapacityExceeded {
        /// Which collection overflowed.
        what: &'static str,
        /// Its fixed capacity.
        max: usize,
    },

    /// Palette bytes must be a non-empty multiple of four (RGBA).
    #[error("palette byte length {0} is not a non-empty multiple of 4")]
    InvalidPaletteLength(usize),

    /// An xform index that does not address an existing xform.
    #[error("xform index {index} out of range (have {len})")]
    InvalidIndex {
        /// The offending index.
        index: usize,
        /// Number of xforms present.
        len: usize,
    },

    /// An xform weight that is negative or not a number.
    #[error("xform {index} has invalid weight {weight}")]
    InvalidWeight {
        /// The offending xform.
        index: usize,
        /// Its weight.
        weight: f32,
    },

    /// A canvas with no pixels.
    #[error("invalid canvas dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// A named palette that isn't built in.
    #[error("unknown palette: {0}")]
    UnknownPalette(String),

    /// A packed buffer shorter than its header says it should be.
    #[error("packed buffer truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Filesystem failure while reading or writing a record or image.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON record.
    #[error("record parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image encoding failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Shorthand for results carrying a [`FlameError`].
pub type Result<T> = std::result::Result<T, FlameError>;
