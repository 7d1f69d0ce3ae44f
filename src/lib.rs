#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fractal flame renderer
//!
//! A fractal flame is the attractor of an iterated function system:
//! a handful of maps ("xforms"), each an affine transform followed by a
//! nonlinear warp ("variation").  Start anywhere in the plane, pick a
//! map at random, apply it, and repeat; after a few steps the point is
//! on the attractor and every later step lands somewhere on it too.
//! This is the chaos game.
//!
//! Plot every step into a histogram and the picture is a density: how
//! often the walk visited each pixel.  Each map also carries a colour
//! coordinate that the walk blends toward as it goes, so each pixel
//! accumulates a colour sum as well as a count.  Tone mapping turns the
//! two into an image, with brightness following the logarithm of the
//! density so the faint filaments survive next to the bright core.
//!
//! The pieces, bottom-up: [`rng`] for the per-walk random streams,
//! [`variations`] and [`xform`] for the maps, [`fractal`] for the
//! system, [`histogram`] for the shared accumulator, [`chaos`] for the
//! walks, [`tonemap`] for the colour pipeline, and [`renderer`] to drive
//! frames.  [`record`] and [`packed`] persist and hand off flames.

pub mod chaos;
pub mod config;
pub mod error;
pub mod fractal;
pub mod histogram;
pub mod packed;
pub mod palette;
pub mod planes;
pub mod record;
pub mod renderer;
pub mod rng;
pub mod tonemap;
pub mod variations;
pub mod xform;

pub use crate::chaos::{ChaosGame, FrameStats};
pub use crate::config::RenderConfig;
pub use crate::error::{FlameError, Result};
pub use crate::fractal::Fractal;
pub use crate::histogram::Histogram;
pub use crate::palette::ColorMap;
pub use crate::record::{FlameRecord, PaletteSource};
pub use crate::renderer::{Command, FlameThread, Renderer, Update};
pub use crate::tonemap::{Frame, ToneMapper};
pub use crate::variations::Variation;
pub use crate::xform::{Affine, XForm};
