// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The shared density histogram.
//!
//! Every chaos-game worker writes into the same buffer at once, so each
//! pixel is four atomic counters: red, green and blue sums on a 0 to
//! 255 scale, and a hit count.  The sums are 64 bits wide; a 32-bit sum
//! of 255s would wrap after fewer than seventeen million hits, which a
//! dense pixel reaches within a few frames.  Plotting is nothing but `fetch_add`,
//! which commutes, so the order workers land in doesn't matter.  The
//! histogram is only ever zeroed on request; left alone it keeps
//! accumulating across frames.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::palette::ColorMap;
use crate::planes::{PlaneMapper, Point};

/// One pixel's accumulators.
#[derive(Debug, Default)]
struct Bin {
    r: AtomicU64,
    g: AtomicU64,
    b: AtomicU64,
    hits: AtomicU32,
}

/// A plain copy of one pixel's accumulators.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    /// Sum of red contributions.
    pub r: u64,
    /// Sum of green contributions.
    pub g: u64,
    /// Sum of blue contributions.
    pub b: u64,
    /// Number of points plotted here.
    pub hits: u32,
}

/// Dense per-pixel accumulation buffer plus the running maximum hit
/// count.
#[derive(Debug)]
pub struct Histogram {
    width: usize,
    height: usize,
    bins: Vec<Bin>,
    max: AtomicU32,
}

impl Histogram {
    /// A zeroed histogram for a `width` x `height` canvas.
    pub fn new(width: usize, height: usize) -> Self {
        Histogram {
            width,
            height,
            bins: (0..width * height).map(|_| Bin::default()).collect(),
            max: AtomicU32::new(0),
        }
    }

    /// Canvas width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Canvas height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True for a canvas with no pixels.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Zero every counter and the maximum.  Taking `&mut self` means no
    /// worker can be mid-plot.
    pub fn clear(&mut self) {
        for bin in self.bins.iter_mut() {
            *bin.r.get_mut() = 0;
            *bin.g.get_mut() = 0;
            *bin.b.get_mut() = 0;
            *bin.hits.get_mut() = 0;
        }
        *self.max.get_mut() = 0;
    }

    /// Plot a point with a colour coordinate.  Points outside the view
    /// (including NaN and infinities) are dropped and `false` comes back.
    /// Safe to call from any number of threads at once.
    #[inline]
    pub fn plot(&self, view: &PlaneMapper, point: &Point, color: f32, palette: &ColorMap) -> bool {
        debug_assert_eq!(view.len(), self.bins.len());
        match view.point_to_offset(point) {
            Some(offset) => {
                let [r, g, b] = palette.sample(color);
                self.add(offset, [r.round() as u32, g.round() as u32, b.round() as u32]);
                true
            }
            None => false,
        }
    }

    /// Add one hit of colour `rgb` at a linear pixel offset.
    #[inline]
    pub fn add(&self, offset: usize, rgb: [u32; 3]) {
        let bin = &self.bins[offset];
        bin.r.fetch_add(u64::from(rgb[0]), Ordering::Relaxed);
        bin.g.fetch_add(u64::from(rgb[1]), Ordering::Relaxed);
        bin.b.fetch_add(u64::from(rgb[2]), Ordering::Relaxed);
        bin.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Read one pixel.
    pub fn get(&self, offset: usize) -> Counts {
        let bin = &self.bins[offset];
        Counts {
            r: bin.r.load(Ordering::Relaxed),
            g: bin.g.load(Ordering::Relaxed),
            b: bin.b.load(Ordering::Relaxed),
            hits: bin.hits.load(Ordering::Relaxed),
        }
    }

    /// Read every pixel, row-major.
    pub fn snapshot(&self) -> Vec<Counts> {
        (0..self.bins.len()).map(|i| self.get(i)).collect()
    }

    /// Sum of all hit counts.
    pub fn total_hits(&self) -> u64 {
        self.bins
            .iter()
            .map(|bin| u64::from(bin.hits.load(Ordering::Relaxed)))
            .sum()
    }

    /// Scan every hit count for the maximum, sharded over `threads`
    /// scoped threads that combine with an atomic max.  Callers must
    /// have joined every plotting worker first; the result is stored for
    /// [`Histogram::global_max`] and returned.
    pub fn reduce_max(&self, threads: usize) -> u32 {
        self.max.store(0, Ordering::Relaxed);
        if self.bins.is_empty() {
            return 0;
        }
        let shard = (self.bins.len() + threads.max(1) - 1) / threads.max(1);
        let max = &self.max;
        crossbeam::scope(|spawner| {
            for bins in self.bins.chunks(shard) {
                spawner.spawn(move |_| {
                    let local = bins
                        .iter()
                        .map(|bin| bin.hits.load(Ordering::Relaxed))
                        .max()
                        .unwrap_or(0);
                    max.fetch_max(local, Ordering::Relaxed);
                });
            }
        })
        .expect("max-reduction shard panicked");
        self.max.load(Ordering::Acquire)
    }

    /// The maximum found by the last [`Histogram::reduce_max`].
    pub fn global_max(&self) -> u32 {
        self.max.load(Ordering::Acquire)
    }
}
