// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Colour maps.  A palette is a table of RGB entries sampled by the
//! structural colour coordinate each point carries.

use crate::error::{FlameError, Result};

/// The most entries a palette may hold.
pub const MAX_ENTRIES: usize = 1024;

/// Bytes per packed palette entry (RGBA; alpha ignored).
pub const BYTES_PER_ENTRY: usize = 4;

/// Names accepted by [`ColorMap::builtin`].
pub const BUILTIN_NAMES: [&str; 4] = ["fire", "ocean", "grayscale", "rainbow"];

/// An ordered, non-empty table of RGB colours.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMap {
    entries: Vec<[u8; 3]>,
}

impl ColorMap {
    /// A palette from RGB triplets.
    pub fn new(entries: Vec<[u8; 3]>) -> Result<Self> {
        if entries.is_empty() {
            return Err(FlameError::InvalidPaletteLength(0));
        }
        if entries.len() > MAX_ENTRIES {
            return Err(FlameError::CapacityExceeded {
                what: "palette",
                max: MAX_ENTRIES,
            });
        }
        Ok(ColorMap { entries })
    }

    /// Reinterpret a flat RGBA byte sequence as palette entries.  The
    /// whole buffer is checked before anything is built.
    pub fn from_rgba_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % BYTES_PER_ENTRY != 0 {
            return Err(FlameError::InvalidPaletteLength(bytes.len()));
        }
        ColorMap::new(
            bytes
                .chunks(BYTES_PER_ENTRY)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        )
    }

    /// The palette as RGBA bytes, alpha opaque.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.entries
            .iter()
            .flat_map(|&[r, g, b]| vec![r, g, b, 255])
            .collect()
    }

    /// One of the built-in palettes, by name.
    pub fn builtin(name: &str) -> Result<Self> {
        let stops: &[(f32, [u8; 3])] = match name {
            "fire" => &[
                (0.0, [0, 0, 0]),
                (0.35, [180, 20, 0]),
                (0.7, [255, 160, 0]),
                (1.0, [255, 255, 220]),
            ],
            "ocean" => &[
                (0.0, [0, 10, 40]),
                (0.5, [0, 110, 170]),
                (1.0, [200, 250, 255]),
            ],
            "grayscale" => &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])],
            "rainbow" => &[
                (0.0, [255, 0, 0]),
                (0.2, [255, 255, 0]),
                (0.4, [0, 255, 0]),
                (0.6, [0, 255, 255]),
                (0.8, [0, 0, 255]),
                (1.0, [255, 0, 255]),
            ],
            _ => return Err(FlameError::UnknownPalette(name.to_string())),
        };
        ColorMap::gradient(stops, 256)
    }

    /// Build `len` entries by linear interpolation between `(position,
    /// colour)` stops sorted by position.
    pub fn gradient(stops: &[(f32, [u8; 3])], len: usize) -> Result<Self> {
        if stops.is_empty() {
            return Err(FlameError::InvalidPaletteLength(0));
        }
        let denom = (len.max(2) - 1) as f32;
        let entries = (0..len)
            .map(|i| {
                let t = i as f32 / denom;
                let upper = stops.iter().position(|s| s.0 >= t).unwrap_or(stops.len() - 1);
                let lower = upper.saturating_sub(1);
                let (t0, c0) = stops[lower];
                let (t1, c1) = stops[upper];
                let w = if t1 > t0 { ((t - t0) / (t1 - t0)).max(0.0).min(1.0) } else { 0.0 };
                let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * w).round() as u8;
                [mix(c0[0], c1[0]), mix(c0[1], c1[1]), mix(c0[2], c1[2])]
            })
            .collect();
        ColorMap::new(entries)
    }

    /// Number of entries; never zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a palette can't be built empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The raw entries.
    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }

    /// The colour at `t` in `[0, 1]`, on a 0 to 255 scale, linearly
    /// interpolated between the two nearest entries.  Positions outside
    /// the table clamp to its ends; NaN lands on the first entry.
    #[inline]
    pub fn sample(&self, t: f32) -> [f32; 3] {
        let last = self.entries.len() - 1;
        let pos = (t * last as f32).max(0.0).min(last as f32);
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(last);
        let w = pos - i0 as f32;
        let (a, b) = (self.entries[i0], self.entries[i1]);
        [
            a[0] as f32 + (b[0] as f32 - a[0] as f32) * w,
            a[1] as f32 + (b[1] as f32 - a[1] as f32) * w,
            a[2] as f32 + (b[2] as f32 - a[2] as f32) * w,
        ]
    }
}
