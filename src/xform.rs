// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A single map of the iterated function system: an affine
//! pre-transform, a variation, a colour, a weight, and optional
//! animation of the affine's two basis columns.

use serde::{Deserialize, Serialize};

use crate::planes::Point;
use crate::rng::RandomSource;
use crate::variations::Variation;

/// Radians per frame, per unit of animation speed.
pub const ANIMATION_RATE: f32 = 0.01;

/// The 2x3 affine coefficients:
/// `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Affine {
    /// Build from coefficients in `(a, b, c, d, e, f)` order.
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Affine { a, b, c, d, e, f }
    }

    /// The identity map.
    pub fn identity() -> Self {
        Affine::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    /// Coefficients in `(a, b, c, d, e, f)` order.
    pub fn coefficients(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Transform a point.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.re + self.b * p.im + self.c,
            self.d * p.re + self.e * p.im + self.f,
        )
    }
}

impl Default for Affine {
    fn default() -> Self {
        Affine::identity()
    }
}

/// A basis column captured in polar form when its animation was
/// switched on.  Every animated frame is computed from this, never from
/// the previous frame, so animation can't drift and can be undone.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolarVector {
    /// Length of the column.
    pub magnitude: f32,
    /// Angle of the column, in radians.
    pub phase: f32,
}

impl PolarVector {
    fn capture(x: f32, y: f32) -> Self {
        PolarVector {
            magnitude: (x * x + y * y).sqrt(),
            phase: y.atan2(x),
        }
    }

    fn rotated(&self, by: f32) -> (f32, f32) {
        let (s, c) = (self.phase + by).sin_cos();
        (self.magnitude * c, self.magnitude * s)
    }
}

/// One map in the flame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct XForm {
    /// The nonlinear warp applied after the affine.
    pub variation: Variation,
    /// Pre-transform.
    pub affine: Affine,
    /// Colour coordinate in `[0, 1]`, blended into the running colour.
    pub color: f32,
    /// Relative likelihood used when generating flames.  The chaos game
    /// itself picks xforms uniformly.  Never negative in a valid fractal.
    pub weight: f32,
    #[serde(default)]
    original_x: Option<PolarVector>,
    #[serde(default)]
    original_y: Option<PolarVector>,
}

impl XForm {
    /// A new, unanimated xform.  Negative weights are treated as zero.
    pub fn new(variation: Variation, affine: Affine, color: f32, weight: f32) -> Self {
        XForm {
            variation,
            affine,
            color,
            weight: weight.max(0.0),
            original_x: None,
            original_y: None,
        }
    }

    /// Whether the `(a, d)` column rotates with the frame counter.
    pub fn animate_x(&self) -> bool {
        self.original_x.is_some()
    }

    /// Whether the `(b, e)` column rotates with the frame counter.
    pub fn animate_y(&self) -> bool {
        self.original_y.is_some()
    }

    /// The rest pose of the `(a, d)` column, while it is animated.
    pub fn original_x(&self) -> Option<PolarVector> {
        self.original_x
    }

    /// The rest pose of the `(b, e)` column, while it is animated.
    pub fn original_y(&self) -> Option<PolarVector> {
        self.original_y
    }

    /// Reinstate animation with already-captured rest poses, leaving
    /// the current (posed) coefficients alone.  `None` switches a
    /// column's animation off without touching its coefficients.
    pub fn restore_animation(&mut self, x: Option<PolarVector>, y: Option<PolarVector>) {
        self.original_x = x;
        self.original_y = y;
    }

    /// Switch animation of the `(a, d)` column.  Switching on captures
    /// the current column; switching off puts the captured column back.
    pub fn set_animate_x(&mut self, on: bool) {
        match (on, self.original_x) {
            (true, None) => {
                self.original_x = Some(PolarVector::capture(self.affine.a, self.affine.d));
            }
            (false, Some(original)) => {
                let (a, d) = original.rotated(0.0);
                self.affine.a = a;
                self.affine.d = d;
                self.original_x = None;
            }
            _ => {}
        }
    }

    /// Switch animation of the `(b, e)` column.
    pub fn set_animate_y(&mut self, on: bool) {
        match (on, self.original_y) {
            (true, None) => {
                self.original_y = Some(PolarVector::capture(self.affine.b, self.affine.e));
            }
            (false, Some(original)) => {
                let (b, e) = original.rotated(0.0);
                self.affine.b = b;
                self.affine.e = e;
                self.original_y = None;
            }
            _ => {}
        }
    }

    /// Set the animated columns for `frame`.  Calling this twice with
    /// the same arguments leaves the same coefficients.
    pub fn animate(&mut self, frame: u32, speed: f32) {
        let angle = frame as f32 * speed * ANIMATION_RATE;
        if let Some(original) = self.original_x {
            let (a, d) = original.rotated(angle);
            self.affine.a = a;
            self.affine.d = d;
        }
        if let Some(original) = self.original_y {
            let (b, e) = original.rotated(angle);
            self.affine.b = b;
            self.affine.e = e;
        }
    }

    /// Affine then variation.
    #[inline]
    pub fn apply(&self, p: Point, rng: &mut RandomSource) -> Point {
        self.variation.apply(self.affine.apply(p), rng)
    }
}
