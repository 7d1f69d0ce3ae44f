// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-run render settings.  Controllers change these between frames;
//! the simulation only ever reads them.

use serde::{Deserialize, Serialize};

use crate::error::{FlameError, Result};

/// Scalar state for a run of frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Frame counter.  Drives animation phase and worker seeding.
    pub frame: u32,
    /// Tone-mapping gamma; values under 0.1 are treated as 0.1.
    pub gamma: f32,
    /// Added to hue, wrapping.
    pub hue_shift: f32,
    /// Added to saturation, clamped.
    pub sat_shift: f32,
    /// Added to lightness, clamped.
    pub light_shift: f32,
    /// Scale on the animation phase advance; 0 freezes animation.
    pub animation_speed: f32,
    /// Number of independent chaos-game chains per frame.
    pub num_points: u32,
    /// Plotted steps per chain.
    pub steps_per_point: u32,
    /// Unplotted steps per chain before plotting starts.
    pub warmup: u32,
    /// Worker threads.  Zero means one per CPU.
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 512,
            height: 512,
            frame: 0,
            gamma: 2.2,
            hue_shift: 0.0,
            sat_shift: 0.0,
            light_shift: 0.0,
            animation_speed: 1.0,
            num_points: 20_000,
            steps_per_point: 100,
            warmup: 20,
            threads: 0,
        }
    }
}

impl RenderConfig {
    /// Number of pixels on the canvas.
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The thread count to actually use.
    pub fn worker_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Reject settings the renderer can't work with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlameError::InvalidDimensions(self.width, self.height));
        }
        Ok(())
    }

    /// Set the colour shifts, saturating each into `[-1, 1]`.
    pub fn set_shifts(&mut self, hue: f32, sat: f32, light: f32) {
        self.hue_shift = hue.max(-1.0).min(1.0);
        self.sat_shift = sat.max(-1.0).min(1.0);
        self.light_shift = light.max(-1.0).min(1.0);
    }

    /// Move to the next frame.
    pub fn advance(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_canvas_is_rejected() {
        let mut c = RenderConfig::default();
        assert!(c.validate().is_ok());
        c.width = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn shifts_saturate() {
        let mut c = RenderConfig::default();
        c.set_shifts(3.0, -7.0, 0.25);
        assert_eq!((c.hue_shift, c.sat_shift, c.light_shift), (1.0, -1.0, 0.25));
    }

    #[test]
    fn zero_threads_means_all_cpus() {
        let mut c = RenderConfig::default();
        assert!(c.worker_threads() >= 1);
        c.threads = 3;
        assert_eq!(c.worker_threads(), 3);
    }

    #[test]
    fn frame_counter_wraps() {
        let mut c = RenderConfig::default();
        c.frame = u32::max_value();
        c.advance();
        assert_eq!(c.frame, 0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let c: RenderConfig = serde_json::from_str(r#"{"width": 64, "gamma": 4.0}"#).unwrap();
        assert_eq!(c.width, 64);
        assert_eq!(c.height, 512);
        assert_eq!(c.gamma, 4.0);
        assert_eq!(c.steps_per_point, 100);
    }
}
