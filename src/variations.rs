// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The variation library.
//!
//! A variation is a fixed nonlinear warp of the plane.  Every xform
//! runs its point through an affine pre-transform and then through
//! exactly one of these.  The set is closed, so it's an enum and a
//! `match`; the compiler checks that every variation has a formula.
//!
//! Nothing here guards against singularities.  `Spherical` at the
//! origin divides by zero and hands back infinities or NaN, and that's
//! fine: such points fall outside the window when plotted and vanish.
//!
//! In the formulas, `r` is the distance from the origin, `theta` is
//! `atan2(x, y)` (note the argument order, which is the classic flame
//! convention), and `psi` is a fresh draw from the worker's random
//! source.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FlameError;
use crate::planes::Point;
use crate::rng::RandomSource;

/// One of the 33 known variations.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Variation {
    Linear,
    Sinusoidal,
    Spherical,
    Swirl,
    Horseshoe,
    Polar,
    Handkerchief,
    Heart,
    Disc,
    Spiral,
    Hyperbolic,
    Diamond,
    Ex,
    Julia,
    Bent,
    Fisheye,
    Exponential,
    Power,
    Cosine,
    Eyefish,
    Bubble,
    Cylinder,
    Noise,
    Blur,
    Gaussian,
    Arch,
    Tangent,
    Square,
    Rays,
    Blade,
    Secant,
    Twintrian,
    Cross,
}

impl Variation {
    /// Every variation, in id order.
    pub const ALL: [Variation; 33] = [
        Variation::Linear,
        Variation::Sinusoidal,
        Variation::Spherical,
        Variation::Swirl,
        Variation::Horseshoe,
        Variation::Polar,
        Variation::Handkerchief,
        Variation::Heart,
        Variation::Disc,
        Variation::Spiral,
        Variation::Hyperbolic,
        Variation::Diamond,
        Variation::Ex,
        Variation::Julia,
        Variation::Bent,
        Variation::Fisheye,
        Variation::Exponential,
        Variation::Power,
        Variation::Cosine,
        Variation::Eyefish,
        Variation::Bubble,
        Variation::Cylinder,
        Variation::Noise,
        Variation::Blur,
        Variation::Gaussian,
        Variation::Arch,
        Variation::Tangent,
        Variation::Square,
        Variation::Rays,
        Variation::Blade,
        Variation::Secant,
        Variation::Twintrian,
        Variation::Cross,
    ];

    /// The variation with the given numeric id.
    pub fn from_id(id: u32) -> Result<Variation, FlameError> {
        Variation::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| FlameError::UnknownVariation(id.to_string()))
    }

    /// The numeric id, as used in packed buffers.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// The canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Variation::Linear => "linear",
            Variation::Sinusoidal => "sinusoidal",
            Variation::Spherical => "spherical",
            Variation::Swirl => "swirl",
            Variation::Horseshoe => "horseshoe",
            Variation::Polar => "polar",
            Variation::Handkerchief => "handkerchief",
            Variation::Heart => "heart",
            Variation::Disc => "disc",
            Variation::Spiral => "spiral",
            Variation::Hyperbolic => "hyperbolic",
            Variation::Diamond => "diamond",
            Variation::Ex => "ex",
            Variation::Julia => "julia",
            Variation::Bent => "bent",
            Variation::Fisheye => "fisheye",
            Variation::Exponential => "exponential",
            Variation::Power => "power",
            Variation::Cosine => "cosine",
            Variation::Eyefish => "eyefish",
            Variation::Bubble => "bubble",
            Variation::Cylinder => "cylinder",
            Variation::Noise => "noise",
            Variation::Blur => "blur",
            Variation::Gaussian => "gaussian",
            Variation::Arch => "arch",
            Variation::Tangent => "tangent",
            Variation::Square => "square",
            Variation::Rays => "rays",
            Variation::Blade => "blade",
            Variation::Secant => "secant",
            Variation::Twintrian => "twintrian",
            Variation::Cross => "cross",
        }
    }

    /// Whether the variation draws from the random source.
    pub fn is_stochastic(self) -> bool {
        match self {
            Variation::Julia
            | Variation::Noise
            | Variation::Blur
            | Variation::Gaussian
            | Variation::Arch
            | Variation::Square
            | Variation::Rays
            | Variation::Blade
            | Variation::Twintrian => true,
            _ => false,
        }
    }

    /// Warp a point.  Only the stochastic variations touch `rng`.
    pub fn apply(self, p: Point, rng: &mut RandomSource) -> Point {
        let (x, y) = (p.re, p.im);
        let r2 = x * x + y * y;
        let r = r2.sqrt();
        let theta = x.atan2(y);

        match self {
            Variation::Linear => p,
            Variation::Sinusoidal => Point::new(x.sin(), y.sin()),
            Variation::Spherical => Point::new(x / r2, y / r2),
            Variation::Swirl => {
                let (s, c) = r2.sin_cos();
                Point::new(x * s - y * c, x * c + y * s)
            }
            Variation::Horseshoe => Point::new((x - y) * (x + y) / r, 2.0 * x * y / r),
            Variation::Polar => Point::new(theta / PI, r - 1.0),
            Variation::Handkerchief => Point::new(r * (theta + r).sin(), r * (theta - r).cos()),
            Variation::Heart => {
                let (s, c) = (theta * r).sin_cos();
                Point::new(r * s, -r * c)
            }
            Variation::Disc => {
                let (s, c) = (PI * r).sin_cos();
                let t = theta / PI;
                Point::new(t * s, t * c)
            }
            Variation::Spiral => Point::new(
                (theta.cos() + r.sin()) / r,
                (theta.sin() - r.cos()) / r,
            ),
            Variation::Hyperbolic => Point::new(theta.sin() / r, r * theta.cos()),
            Variation::Diamond => Point::new(theta.sin() * r.cos(), theta.cos() * r.sin()),
            Variation::Ex => {
                let p0 = (theta + r).sin();
                let p1 = (theta - r).cos();
                let (p0, p1) = (p0 * p0 * p0, p1 * p1 * p1);
                Point::new(r * (p0 + p1), r * (p0 - p1))
            }
            Variation::Julia => {
                let omega = if rng.next() & 1 == 1 { PI } else { 0.0 };
                let (s, c) = (theta / 2.0 + omega).sin_cos();
                let sr = r.sqrt();
                Point::new(sr * c, sr * s)
            }
            Variation::Bent => match (x < 0.0, y < 0.0) {
                (false, false) => p,
                (true, false) => Point::new(2.0 * x, y),
                (false, true) => Point::new(x, y / 2.0),
                (true, true) => Point::new(2.0 * x, y / 2.0),
            },
            Variation::Fisheye => {
                let k = 2.0 / (r + 1.0);
                Point::new(k * y, k * x)
            }
            Variation::Exponential => {
                let k = (x - 1.0).exp();
                let (s, c) = (PI * y).sin_cos();
                Point::new(k * c, k * s)
            }
            Variation::Power => {
                let (s, c) = theta.sin_cos();
                let k = r.powf(s);
                Point::new(k * c, k * s)
            }
            Variation::Cosine => Point::new(
                (PI * x).cos() * y.cosh(),
                -(PI * x).sin() * y.sinh(),
            ),
            Variation::Eyefish => p * (2.0 / (r + 1.0)),
            Variation::Bubble => p * (4.0 / (r2 + 4.0)),
            Variation::Cylinder => Point::new(x.sin(), y),
            Variation::Noise => {
                let psi1 = rng.next_float();
                let (s, c) = (2.0 * PI * rng.next_float()).sin_cos();
                Point::new(psi1 * x * c, psi1 * y * s)
            }
            Variation::Blur => {
                let psi1 = rng.next_float();
                let (s, c) = (2.0 * PI * rng.next_float()).sin_cos();
                Point::new(psi1 * c, psi1 * s)
            }
            Variation::Gaussian => {
                let sum = rng.next_float() + rng.next_float() + rng.next_float() + rng.next_float();
                let (s, c) = (2.0 * PI * rng.next_float()).sin_cos();
                Point::new((sum - 2.0) * c, (sum - 2.0) * s)
            }
            Variation::Arch => {
                let (s, c) = (rng.next_float() * PI).sin_cos();
                Point::new(s, s * s / c)
            }
            Variation::Tangent => Point::new(x.sin() / y.cos(), y.tan()),
            Variation::Square => {
                let psi1 = rng.next_float();
                let psi2 = rng.next_float();
                Point::new(psi1 - 0.5, psi2 - 0.5)
            }
            Variation::Rays => {
                let k = (rng.next_float() * PI).tan() / r2;
                Point::new(k * x.cos(), k * y.sin())
            }
            Variation::Blade => {
                let (s, c) = (rng.next_float() * r).sin_cos();
                Point::new(x * (c + s), x * (c - s))
            }
            Variation::Secant => Point::new(x, 1.0 / r.cos()),
            Variation::Twintrian => {
                let (s, c) = (rng.next_float() * r).sin_cos();
                let diff = (s * s).log10() + c;
                Point::new(x * diff, x * (diff - s * PI))
            }
            Variation::Cross => {
                let d = x * x - y * y;
                let s = (1.0 / (d * d)).sqrt();
                p * s
            }
        }
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Names are matched without regard to case; a bare number is taken
/// as a numeric id.
impl FromStr for Variation {
    type Err = FlameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u32>() {
            return Variation::from_id(id);
        }
        Variation::ALL
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FlameError::UnknownVariation(s.to_string()))
    }
}

impl std::convert::TryFrom<String> for Variation {
    type Error = FlameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Variation> for String {
    fn from(v: Variation) -> String {
        v.name().to_string()
    }
}
