// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tone mapping: turn accumulated sums and hit counts into colours.
//!
//! Brightness is log-density: a pixel's alpha is the log of its hit
//! count against the log of the busiest pixel's, raised to one over
//! gamma.  Its hue is the average palette colour that landed there,
//! shifted in HSL and sRGB-encoded.  Each pixel is independent.

use image::{Rgba, RgbaImage};
use itertools::iproduct;
use num::clamp;

use crate::config::RenderConfig;
use crate::histogram::{Counts, Histogram};

/// Gamma never goes below this.
pub const MIN_GAMMA: f32 = 0.1;

/// A rendered frame: straight RGBA floats, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// `[r, g, b, a]` per pixel.  Empty pixels are all zero.
    pub pixels: Vec<[f32; 4]>,
}

impl Frame {
    /// The pixel at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 4] {
        self.pixels[y * self.width + x]
    }

    /// Quantize to 8 bits per channel.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let p = self.pixel(x as usize, y as usize);
            let q = |c: f32| (clamp(c, 0.0, 1.0) * 255.0).round() as u8;
            Rgba([q(p[0]), q(p[1]), q(p[2]), q(p[3])])
        })
    }
}

/// The per-pixel colour pipeline's settings.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToneMapper {
    /// Gamma for the density curve.
    pub gamma: f32,
    /// Hue shift, wrapping.
    pub hue_shift: f32,
    /// Saturation shift.
    pub sat_shift: f32,
    /// Lightness shift.
    pub light_shift: f32,
}

impl Default for ToneMapper {
    fn default() -> Self {
        ToneMapper {
            gamma: 2.2,
            hue_shift: 0.0,
            sat_shift: 0.0,
            light_shift: 0.0,
        }
    }
}

impl<'a> From<&'a RenderConfig> for ToneMapper {
    fn from(config: &'a RenderConfig) -> Self {
        ToneMapper {
            gamma: config.gamma,
            hue_shift: config.hue_shift,
            sat_shift: config.sat_shift,
            light_shift: config.light_shift,
        }
    }
}

impl ToneMapper {
    /// Map one pixel given the frame's maximum hit count.
    pub fn map(&self, counts: Counts, max: u32) -> [f32; 4] {
        if counts.hits == 0 {
            return [0.0; 4];
        }
        let hits = counts.hits as f32;
        let mean = |sum: u64| (sum as f64 / 255.0 / f64::from(counts.hits)) as f32;
        let color = [mean(counts.r), mean(counts.g), mean(counts.b)];
        // ln(1)/ln(1) is 0/0; a frame whose busiest pixel has one hit
        // shows every hit pixel at full strength.
        let density = if max > 1 {
            (hits.ln() / (max as f32).ln()).min(1.0)
        } else {
            1.0
        };
        let alpha = density.powf(1.0 / self.gamma.max(MIN_GAMMA));

        let [r, g, b] = self.shift(color);
        [
            srgb_encode(r) * alpha,
            srgb_encode(g) * alpha,
            srgb_encode(b) * alpha,
            1.0,
        ]
    }

    fn shift(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [h, s, l] = rgb_to_hsl(rgb);
        let h = (h + self.hue_shift).rem_euclid(1.0);
        let s = clamp(s + self.sat_shift, 0.0, 1.0);
        let l = clamp(l + self.light_shift, 0.0, 1.0);
        hsl_to_rgb([h, s, l])
    }

    /// Map the whole histogram against its current global maximum.
    /// Rows are split over `threads` scoped threads; the histogram is
    /// only read.
    pub fn render(&self, histogram: &Histogram, threads: usize) -> Frame {
        let (width, height) = (histogram.width(), histogram.height());
        let max = histogram.global_max();
        let mut pixels = vec![[0.0f32; 4]; width * height];
        if pixels.is_empty() {
            return Frame {
                width,
                height,
                pixels,
            };
        }

        let rows_per_band = (height + threads.max(1) - 1) / threads.max(1);
        crossbeam::scope(|spawner| {
            for (band, out) in pixels.chunks_mut(rows_per_band * width).enumerate() {
                spawner.spawn(move |_| {
                    let first_row = band * rows_per_band;
                    let rows = out.len() / width;
                    for (row, col) in iproduct!(0..rows, 0..width) {
                        let offset = (first_row + row) * width + col;
                        out[row * width + col] = self.map(histogram.get(offset), max);
                    }
                });
            }
        })
        .expect("tone-mapping band panicked");

        Frame {
            width,
            height,
            pixels,
        }
    }
}

/// The sRGB transfer function, mirrored for negative inputs.
pub fn srgb_encode(c: f32) -> f32 {
    let a = c.abs();
    let e = if a <= 0.003_130_8 {
        a * 12.92
    } else {
        1.055 * a.powf(1.0 / 2.4) - 0.055
    };
    e.copysign(c)
}

/// RGB in `[0, 1]` to hue, saturation, lightness, each in `[0, 1]`.
pub fn rgb_to_hsl([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;
    if d <= 0.0 {
        return [0.0, 0.0, l];
    }
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    [h / 6.0, s, l]
}

/// Hue, saturation, lightness back to RGB.
pub fn hsl_to_rgb([h, s, l]: [f32; 3]) -> [f32; 3] {
    if s <= 0.0 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
