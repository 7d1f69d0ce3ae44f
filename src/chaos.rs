// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The chaos game.
//!
//! A frame is a large number of short, independent random walks.  Each
//! walk is seeded from the frame counter and its own index, starts at a
//! random point, takes a few unplotted warm-up steps to fall onto the
//! attractor, and then plots every step.  Walks share nothing but the
//! histogram, which they only ever add to, so they're spread across
//! scoped threads that claim batches of walk indices from an atomic
//! counter.
//!
//! Nothing carries over between frames except the histogram itself.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use num::Complex;

use crate::error::Result;
use crate::fractal::Fractal;
use crate::histogram::Histogram;
use crate::palette::ColorMap;
use crate::planes::{PlaneMapper, Point};
use crate::rng::RandomSource;

/// Walks a thread claims at a time.
const BATCH: usize = 64;

/// Sign patterns for mirroring, keyed on the step index.  With one
/// mirror axis only the first two rows are used.
const MIRROR_BOTH: [(f32, f32); 4] = [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)];

/// How many plot calls landed and how many were dropped.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Steps that landed inside the window.
    pub plotted: u64,
    /// Steps that fell outside it, NaN included.
    pub dropped: u64,
}

impl FrameStats {
    fn merge(self, other: FrameStats) -> FrameStats {
        FrameStats {
            plotted: self.plotted + other.plotted,
            dropped: self.dropped + other.dropped,
        }
    }
}

/// The walker's own state: position, colour, and its random stream.
#[derive(Clone, Debug)]
struct Walker {
    point: Point,
    color: f32,
    rng: RandomSource,
}

/// Everything one frame of walks needs, borrowed for the frame.
pub struct ChaosGame<'a> {
    fractal: &'a Fractal,
    palette: &'a ColorMap,
    view: PlaneMapper,
    frame: u32,
    warmup: u32,
    steps: u32,
    rotation: Option<Complex<f32>>,
}

impl<'a> ChaosGame<'a> {
    /// Set up a frame over a `width` x `height` canvas.
    pub fn new(
        fractal: &'a Fractal,
        palette: &'a ColorMap,
        width: usize,
        height: usize,
        frame: u32,
    ) -> Result<Self> {
        let view = PlaneMapper::new(width, height, fractal.origin_point(), fractal.zoom)?;
        let rotation = if fractal.rotation_order > 1 {
            Some(Complex::from_polar(1.0, 2.0 * PI / fractal.rotation_order as f32))
        } else {
            None
        };
        Ok(ChaosGame {
            fractal,
            palette,
            view,
            frame,
            warmup: 20,
            steps: 100,
            rotation,
        })
    }

    /// Override the unplotted and plotted step counts per walk.
    pub fn with_steps(mut self, warmup: u32, steps: u32) -> Self {
        self.warmup = warmup;
        self.steps = steps;
        self
    }

    /// The view the walks are plotted through.
    pub fn view(&self) -> &PlaneMapper {
        &self.view
    }

    fn spawn_walker(&self, index: u32) -> Walker {
        let mut rng = RandomSource::for_worker(self.frame, index);
        let x = 2.0 * rng.next_float() - 1.0;
        let y = 2.0 * rng.next_float() - 1.0;
        let color = rng.next_float();
        Walker {
            point: Point::new(x, y),
            color,
            rng,
        }
    }

    /// One step of the walk: pick an xform uniformly, move, blend colour.
    #[inline]
    fn advance(&self, walker: &mut Walker) {
        let xforms = self.fractal.xforms();
        let i = walker.rng.next() as usize % xforms.len();
        let xform = &xforms[i];
        walker.point = xform.apply(walker.point, &mut walker.rng);
        walker.color = (walker.color + xform.color) / 2.0;
    }

    /// What gets plotted for step `k`: the walker's state after final
    /// and colour-final xforms, mirroring and rotation.  The walker
    /// itself is untouched.
    #[inline]
    fn post(&self, walker: &mut Walker, k: u32) -> (Point, f32) {
        let xforms = self.fractal.xforms();
        let mut point = walker.point;
        let mut color = walker.color;

        if let Some(xform) = self.fractal.final_xform().and_then(|i| xforms.get(i)) {
            point = xform.apply(point, &mut walker.rng);
        }
        if let Some(xform) = self.fractal.color_final_xform().and_then(|i| xforms.get(i)) {
            color = (color + xform.color) / 2.0;
        }

        let origin = self.view.origin;
        let (sx, sy) = mirror_signs(self.fractal.mirror_x, self.fractal.mirror_y, k);
        let offset = point - origin;
        point = origin + Point::new(offset.re * sx, offset.im * sy);

        if let Some(step) = self.rotation {
            let turns = k % self.fractal.rotation_order;
            point = origin + (point - origin) * step.powu(turns);
        }
        (point, color)
    }

    /// Run walk number `index` to completion, plotting into `histogram`.
    pub fn run_walker(&self, index: u32, histogram: &Histogram) -> FrameStats {
        let mut stats = FrameStats::default();
        if self.fractal.is_empty() {
            return stats;
        }
        let mut walker = self.spawn_walker(index);
        for _ in 0..self.warmup {
            self.advance(&mut walker);
        }
        for k in 0..self.steps {
            self.advance(&mut walker);
            let (point, color) = self.post(&mut walker, k);
            if histogram.plot(&self.view, &point, color, self.palette) {
                stats.plotted += 1;
            } else {
                stats.dropped += 1;
            }
        }
        stats
    }

    /// Run `walks` walks over `threads` scoped threads.  Returns once
    /// every thread has joined, so the histogram is complete for the
    /// frame when this comes back.
    pub fn run(&self, histogram: &Histogram, walks: u32, threads: usize) -> FrameStats {
        if self.fractal.is_empty() || walks == 0 {
            return FrameStats::default();
        }
        let walks = walks as usize;
        let next = AtomicUsize::new(0);
        let threads = threads.max(1).min((walks + BATCH - 1) / BATCH);

        let mut total = FrameStats::default();
        crossbeam::scope(|spawner| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let next = &next;
                    spawner.spawn(move |_| {
                        let mut stats = FrameStats::default();
                        loop {
                            let start = next.fetch_add(BATCH, Ordering::Relaxed);
                            if start >= walks {
                                break;
                            }
                            for index in start..(start + BATCH).min(walks) {
                                stats = stats.merge(self.run_walker(index as u32, histogram));
                            }
                        }
                        stats
                    })
                })
                .collect();

            total = handles
                .into_iter()
                .map(|handle| handle.join().expect("chaos game worker panicked"))
                .fold(FrameStats::default(), FrameStats::merge);
        })
        .expect("chaos game scope panicked");
        total
    }
}

/// Signs applied to a plotted point at step `k`.  One mirror axis flips
/// on odd steps; both axes walk through all four sign combinations.
#[inline]
pub fn mirror_signs(mirror_x: bool, mirror_y: bool, k: u32) -> (f32, f32) {
    let odd = k % 2 == 1;
    match (mirror_x, mirror_y) {
        (false, false) => (1.0, 1.0),
        (true, false) => (if odd { -1.0 } else { 1.0 }, 1.0),
        (false, true) => (1.0, if odd { -1.0 } else { 1.0 }),
        (true, true) => MIRROR_BOTH[(k % 4) as usize],
    }
}
