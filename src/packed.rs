// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Fixed-capacity binary records for handing a flame across a process
//! or device boundary.
//!
//! Memory layout, all little-endian, 4-byte fields:
//! - Config record, 80 bytes: frame, width, height, num_points, steps,
//!   warmup (u32); final, color_final (i32, -1 for none); rotation,
//!   flags (u32, bit 0 mirror_x, bit 1 mirror_y); zoom, origin x,
//!   origin y, gamma, hue, sat, light, animation speed (f32);
//!   xform count, palette length (u32).
//! - XForm table, 128 slots of 48 bytes: variation id (u32); a, b, c,
//!   d, e, f, color, weight (f32); flags (u32, bit 0 animate_x, bit 1
//!   animate_y); rest-pose phase of the `(a, d)` column and of the
//!   `(b, e)` column (f32, zero unless that column is animated).
//! - Colour-map table, 1024 slots of 4 bytes: r, g, b, 255.
//!
//! The coefficients are the current, posed frame.  Rotation keeps a
//! column's length, so the rest pose of an animated column is its
//! current length at the stored phase.

use crate::config::RenderConfig;
use crate::error::{FlameError, Result};
use crate::fractal::{Fractal, MAX_XFORMS};
use crate::palette::{ColorMap, BYTES_PER_ENTRY, MAX_ENTRIES};
use crate::variations::Variation;
use crate::xform::{Affine, PolarVector, XForm};

/// A flame packed into its three fixed-size records.
#[derive(Clone, Debug, PartialEq)]
pub struct PackedFlame {
    /// The config record.
    pub config: Vec<u8>,
    /// The xform table, always at full capacity.
    pub xforms: Vec<u8>,
    /// The colour-map table, always at full capacity.
    pub palette: Vec<u8>,
}

/// Sizes and offsets of the packed records.
pub struct PackedBufferLayout;

impl PackedBufferLayout {
    /// Bytes in the config record.
    pub const CONFIG_BYTES: usize = 80;
    /// Bytes per xform slot.
    pub const XFORM_BYTES: usize = 48;
    /// Bytes in the xform table.
    pub const XFORM_TABLE_BYTES: usize = Self::XFORM_BYTES * MAX_XFORMS;
    /// Bytes in the colour-map table.
    pub const PALETTE_TABLE_BYTES: usize = BYTES_PER_ENTRY * MAX_ENTRIES;

    const XFORM_COUNT_OFFSET: usize = 72;
    const PALETTE_LEN_OFFSET: usize = 76;

    /// Byte offset of xform slot `index`.
    pub fn xform_offset(index: usize) -> usize {
        index * Self::XFORM_BYTES
    }

    /// Pack a fractal, its config and its palette.
    pub fn pack(fractal: &Fractal, config: &RenderConfig, palette: &ColorMap) -> PackedFlame {
        let mut xforms = vec![0u8; Self::XFORM_TABLE_BYTES];
        for (i, xform) in fractal.xforms().iter().enumerate() {
            let at = Self::xform_offset(i);
            xforms[at..at + Self::XFORM_BYTES].copy_from_slice(&Self::encode_xform(xform));
        }

        let mut table = palette.to_rgba_bytes();
        table.resize(Self::PALETTE_TABLE_BYTES, 0);

        PackedFlame {
            config: Self::encode_config(fractal, config, palette.len()),
            xforms,
            palette: table,
        }
    }

    /// Rebuild a fractal, config and palette, checking every invariant
    /// the typed API would.
    pub fn unpack(packed: &PackedFlame) -> Result<(Fractal, RenderConfig, ColorMap)> {
        let header = Reader::new(&packed.config, Self::CONFIG_BYTES)?;
        let xform_count = header.u32(Self::XFORM_COUNT_OFFSET) as usize;
        let palette_len = header.u32(Self::PALETTE_LEN_OFFSET) as usize;

        if xform_count > MAX_XFORMS {
            return Err(FlameError::CapacityExceeded {
                what: "xform",
                max: MAX_XFORMS,
            });
        }
        if palette_len > MAX_ENTRIES {
            return Err(FlameError::CapacityExceeded {
                what: "palette",
                max: MAX_ENTRIES,
            });
        }

        Reader::new(&packed.xforms, xform_count * Self::XFORM_BYTES)?;
        let xforms = (0..xform_count)
            .map(|i| {
                let at = Self::xform_offset(i);
                Self::decode_xform(&packed.xforms[at..at + Self::XFORM_BYTES])
            })
            .collect::<Result<Vec<_>>>()?;

        Reader::new(&packed.palette, palette_len * BYTES_PER_ENTRY)?;
        let palette = ColorMap::from_rgba_bytes(&packed.palette[..palette_len * BYTES_PER_ENTRY])?;

        let mut fractal = Fractal::with_xforms(xforms)?;
        fractal.set_final_xform(index_from(header.i32(24)))?;
        fractal.set_color_final_xform(index_from(header.i32(28)))?;
        fractal.rotation_order = header.u32(32);
        let flags = header.u32(36);
        fractal.mirror_x = flags & 1 != 0;
        fractal.mirror_y = flags & 2 != 0;
        fractal.zoom = header.f32(40);
        fractal.origin = (header.f32(44), header.f32(48));

        let config = RenderConfig {
            frame: header.u32(0),
            width: header.u32(4),
            height: header.u32(8),
            num_points: header.u32(12),
            steps_per_point: header.u32(16),
            warmup: header.u32(20),
            gamma: header.f32(52),
            hue_shift: header.f32(56),
            sat_shift: header.f32(60),
            light_shift: header.f32(64),
            animation_speed: header.f32(68),
            ..RenderConfig::default()
        };
        config.validate()?;

        Ok((fractal, config, palette))
    }

    fn encode_config(fractal: &Fractal, config: &RenderConfig, palette_len: usize) -> Vec<u8> {
        let flags = (fractal.mirror_x as u32) | ((fractal.mirror_y as u32) << 1);
        let mut bytes = Vec::with_capacity(Self::CONFIG_BYTES);
        for word in &[
            config.frame,
            config.width,
            config.height,
            config.num_points,
            config.steps_per_point,
            config.warmup,
        ] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(&index_to(fractal.final_xform()).to_le_bytes());
        bytes.extend_from_slice(&index_to(fractal.color_final_xform()).to_le_bytes());
        bytes.extend_from_slice(&fractal.rotation_order.to_le_bytes());
        bytes.extend_from_slice(&flags.to_le_bytes());
        for float in &[
            fractal.zoom,
            fractal.origin.0,
            fractal.origin.1,
            config.gamma,
            config.hue_shift,
            config.sat_shift,
            config.light_shift,
            config.animation_speed,
        ] {
            bytes.extend_from_slice(&float.to_le_bytes());
        }
        bytes.extend_from_slice(&(fractal.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(palette_len as u32).to_le_bytes());
        debug_assert_eq!(bytes.len(), Self::CONFIG_BYTES);
        bytes
    }

    /// Encode one xform slot.
    pub fn encode_xform(xform: &XForm) -> [u8; 48] {
        let mut bytes = [0u8; 48];
        bytes[0..4].copy_from_slice(&xform.variation.id().to_le_bytes());
        let floats = xform.affine.coefficients();
        for (i, value) in floats.iter().chain(&[xform.color, xform.weight]).enumerate() {
            let at = 4 + i * 4;
            bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        let flags = (xform.animate_x() as u32) | ((xform.animate_y() as u32) << 1);
        bytes[36..40].copy_from_slice(&flags.to_le_bytes());
        let phase = |original: Option<PolarVector>| original.map(|o| o.phase).unwrap_or(0.0);
        bytes[40..44].copy_from_slice(&phase(xform.original_x()).to_le_bytes());
        bytes[44..48].copy_from_slice(&phase(xform.original_y()).to_le_bytes());
        bytes
    }

    /// Decode one xform slot.  An unknown variation id is an error.
    pub fn decode_xform(bytes: &[u8]) -> Result<XForm> {
        let slot = Reader::new(bytes, Self::XFORM_BYTES)?;
        let variation = Variation::from_id(slot.u32(0))?;
        let affine = Affine::new(
            slot.f32(4),
            slot.f32(8),
            slot.f32(12),
            slot.f32(16),
            slot.f32(20),
            slot.f32(24),
        );
        let flags = slot.u32(36);
        let rest = |on: bool, p: f32, q: f32, phase: f32| {
            if on {
                Some(PolarVector {
                    magnitude: (p * p + q * q).sqrt(),
                    phase,
                })
            } else {
                None
            }
        };
        let original_x = rest(flags & 1 != 0, affine.a, affine.d, slot.f32(40));
        let original_y = rest(flags & 2 != 0, affine.b, affine.e, slot.f32(44));
        let mut xform = XForm::new(variation, affine, slot.f32(28), slot.f32(32));
        xform.restore_animation(original_x, original_y);
        Ok(xform)
    }
}

fn index_to(index: Option<usize>) -> i32 {
    index.map(|i| i as i32).unwrap_or(-1)
}

fn index_from(raw: i32) -> Option<usize> {
    if raw < 0 {
        None
    } else {
        Some(raw as usize)
    }
}

/// Bounds-checked little-endian field reads.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], expected: usize) -> Result<Self> {
        if bytes.len() < expected {
            return Err(FlameError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Reader { bytes })
    }

    fn word(&self, at: usize) -> [u8; 4] {
        [
            self.bytes[at],
            self.bytes[at + 1],
            self.bytes[at + 2],
            self.bytes[at + 3],
        ]
    }

    fn u32(&self, at: usize) -> u32 {
        u32::from_le_bytes(self.word(at))
    }

    fn i32(&self, at: usize) -> i32 {
        i32::from_le_bytes(self.word(at))
    }

    fn f32(&self, at: usize) -> f32 {
        f32::from_bits(self.u32(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flame() -> (Fractal, RenderConfig, ColorMap) {
        let mut fractal = Fractal::with_xforms(vec![
            XForm::new(
                Variation::Swirl,
                Affine::new(0.5, -0.25, 0.1, 0.3, 0.75, -0.4),
                0.2,
                0.7,
            ),
            XForm::new(Variation::Cross, Affine::identity(), 0.9, 0.1),
        ])
        .unwrap();
        fractal.set_final_xform(Some(1)).unwrap();
        fractal.rotation_order = 3;
        fractal.mirror_y = true;
        fractal.zoom = 0.6;
        fractal.origin = (0.1, -0.2);
        let config = RenderConfig {
            frame: 42,
            width: 320,
            height: 200,
            gamma: 3.0,
            hue_shift: 0.25,
            ..RenderConfig::default()
        };
        let palette = ColorMap::builtin("ocean").unwrap();
        (fractal, config, palette)
    }

    #[test]
    fn records_have_fixed_sizes() {
        let (f, c, p) = flame();
        let packed = PackedBufferLayout::pack(&f, &c, &p);
        assert_eq!(packed.config.len(), PackedBufferLayout::CONFIG_BYTES);
        assert_eq!(packed.xforms.len(), 128 * 48);
        assert_eq!(packed.palette.len(), 1024 * 4);
        assert_eq!(PackedBufferLayout::xform_offset(1), 48);
    }

    #[test]
    fn pack_unpack_reproduces_the_flame() {
        let (f, c, p) = flame();
        let packed = PackedBufferLayout::pack(&f, &c, &p);
        let (f2, c2, p2) = PackedBufferLayout::unpack(&packed).unwrap();
        assert_eq!(f2, f);
        assert_eq!(p2, p);
        assert_eq!(c2.frame, 42);
        assert_eq!((c2.width, c2.height), (320, 200));
        assert_eq!(c2.gamma, 3.0);
        assert_eq!(c2.hue_shift, 0.25);
        assert_eq!(c2.num_points, c.num_points);
    }

    #[test]
    fn fields_sit_where_documented() {
        let (f, c, p) = flame();
        let packed = PackedBufferLayout::pack(&f, &c, &p);
        assert_eq!(&packed.config[0..4], &42u32.to_le_bytes());
        assert_eq!(&packed.config[24..28], &1i32.to_le_bytes());
        assert_eq!(&packed.config[28..32], &(-1i32).to_le_bytes());
        assert_eq!(&packed.config[36..40], &2u32.to_le_bytes());
        assert_eq!(&packed.config[72..76], &2u32.to_le_bytes());
        assert_eq!(&packed.config[76..80], &256u32.to_le_bytes());
        assert_eq!(&packed.xforms[0..4], &Variation::Swirl.id().to_le_bytes());
        assert_eq!(&packed.xforms[48..52], &Variation::Cross.id().to_le_bytes());
        assert_eq!(packed.palette[3], 255);
    }

    #[test]
    fn animation_flags_travel() {
        let mut x = XForm::new(Variation::Linear, Affine::identity(), 0.0, 1.0);
        x.set_animate_y(true);
        let back = PackedBufferLayout::decode_xform(&PackedBufferLayout::encode_xform(&x)).unwrap();
        assert!(!back.animate_x());
        assert!(back.animate_y());
    }

    #[test]
    fn animated_poses_keep_their_rest_pose() {
        let close = |a: f32, b: f32| (a - b).abs() < 1e-5;
        let mut f = Fractal::with_xforms(vec![XForm::new(
            Variation::Linear,
            Affine::new(0.8, 0.3, 0.1, -0.2, 0.6, 0.0),
            0.5,
            1.0,
        )])
        .unwrap();
        {
            let x = f.xform_mut(0).unwrap();
            x.set_animate_x(true);
            x.set_animate_y(true);
        }
        f.animate(100, 1.0);
        let posed = f.xforms()[0].affine;

        let (c, p) = (RenderConfig::default(), ColorMap::builtin("fire").unwrap());
        let (mut back, _, _) =
            PackedBufferLayout::unpack(&PackedBufferLayout::pack(&f, &c, &p)).unwrap();
        assert_eq!(back.xforms()[0].affine, posed);

        // Posing again for the same frame is a no-op on both sides.
        back.animate(100, 1.0);
        let again = back.xforms()[0].affine;
        for (a, b) in again.coefficients().iter().zip(posed.coefficients().iter()) {
            assert!(close(*a, *b), "{:?} vs {:?}", again, posed);
        }

        // And frame zero is the rest pose.
        back.animate(0, 1.0);
        let rest = back.xforms()[0].affine;
        assert!(close(rest.a, 0.8) && close(rest.d, -0.2));
        assert!(close(rest.b, 0.3) && close(rest.e, 0.6));
    }

    #[test]
    fn zero_sized_canvases_are_rejected() {
        let (f, mut c, p) = flame();
        c.width = 0;
        match PackedBufferLayout::unpack(&PackedBufferLayout::pack(&f, &c, &p)) {
            Err(FlameError::InvalidDimensions(0, 200)) => {}
            other => panic!("expected InvalidDimensions, got {:?}", other),
        }
    }

    #[test]
    fn bad_variation_ids_are_rejected() {
        let mut slot = PackedBufferLayout::encode_xform(&XForm::new(
            Variation::Linear,
            Affine::identity(),
            0.0,
            1.0,
        ));
        slot[0..4].copy_from_slice(&99u32.to_le_bytes());
        match PackedBufferLayout::decode_xform(&slot) {
            Err(FlameError::UnknownVariation(id)) => assert_eq!(id, "99"),
            other => panic!("expected UnknownVariation, got {:?}", other),
        }
    }

    #[test]
    fn oversized_counts_and_short_buffers_are_rejected() {
        let (f, c, p) = flame();
        let mut packed = PackedBufferLayout::pack(&f, &c, &p);
        packed.config[72..76].copy_from_slice(&129u32.to_le_bytes());
        assert!(PackedBufferLayout::unpack(&packed).is_err());

        let mut short = PackedBufferLayout::pack(&f, &c, &p);
        short.config.truncate(40);
        match PackedBufferLayout::unpack(&short) {
            Err(FlameError::Truncated { expected, actual }) => {
                assert_eq!((expected, actual), (80, 40))
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
    }

    #[test]
    fn dangling_final_index_is_rejected() {
        let (f, c, p) = flame();
        let mut packed = PackedBufferLayout::pack(&f, &c, &p);
        packed.config[24..28].copy_from_slice(&5i32.to_le_bytes());
        assert!(PackedBufferLayout::unpack(&packed).is_err());
    }
}
