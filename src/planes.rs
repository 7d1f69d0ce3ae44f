//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and the flame's real plane, given as an origin and a zoom factor.
//! Points on the real plane are first taken to normalized device
//! coordinates, where the visible window is the half-open square
//! `[-1, 1) x [-1, 1)`, and from there to pixels.
use num::Complex;

use crate::error::{FlameError, Result};

/// A point on the real plane.  A single complex number is a perfectly
/// good point, and it gets us rotation by multiplication for free.
pub type Point = Complex<f32>;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the column, row of a pixel in a region.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Maps points on the flame's real plane onto the pixel grid.
#[derive(Clone, Debug)]
pub struct PlaneMapper {
    /// The right-lower hand corner of the integral cartesian plane.
    /// The left-upper is assumed to be at 0,0
    pub integral_plane: IntegralPlane,
    /// The point of the real plane shown at the center of the image.
    pub origin: Point,
    /// Scale from the real plane to device coordinates.
    pub zoom: f32,
    // Multipliers from device coordinates shifted into [0, 2) to pixels.
    grid_factors: (f32, f32),
}

impl PlaneMapper {
    /// Constructor.  Takes the size of the integral plane and the
    /// view onto the real plane.  A plane with no pixels is an error.
    pub fn new(width: usize, height: usize, origin: Point, zoom: f32) -> Result<PlaneMapper> {
        if width == 0 || height == 0 {
            return Err(FlameError::InvalidDimensions(width as u32, height as u32));
        }

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(width, height),
            origin,
            zoom,
            grid_factors: ((width as f32) / 2.0, (height as f32) / 2.0),
        })
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Normalized device coordinates of a point on the real plane.
    #[inline]
    pub fn to_device(&self, point: &Point) -> Point {
        (point - self.origin) * self.zoom
    }

    /// Given a point on the real plane, map it to a pixel if it lands
    /// inside the window.  The window is half-open: `-1.0` is in,
    /// `1.0` is out.  NaN and infinities fail the comparisons and are
    /// simply not visible.
    #[inline]
    pub fn point_to_pixel(&self, point: &Point) -> Option<Pixel> {
        let ndc = self.to_device(point);
        if !(ndc.re >= -1.0 && ndc.re < 1.0 && ndc.im >= -1.0 && ndc.im < 1.0) {
            return None;
        }
        let left = ((ndc.re + 1.0) * self.grid_factors.0) as usize;
        let top = ((ndc.im + 1.0) * self.grid_factors.1) as usize;
        // Rounding just under 1.0 can land on the far edge.
        Some(Pixel(
            left.min(self.integral_plane.0 - 1),
            top.min(self.integral_plane.1 - 1),
        ))
    }

    /// Given a pixel on the integral cartesian plane, the point on the
    /// real plane at its upper-left corner.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> Point {
        let ndc = Complex::new(
            (pixel.0 as f32) / self.grid_factors.0 - 1.0,
            (pixel.1 as f32) / self.grid_factors.1 - 1.0,
        );
        ndc / self.zoom + self.origin
    }

    /// This function takes a point, maps it to pixel coordinates, then
    /// returns the linear offset from the root of the image buffer in
    /// memory.
    #[inline]
    pub fn point_to_offset(&self, point: &Point) -> Option<usize> {
        self.point_to_pixel(point)
            .map(|Pixel(left, top)| top * self.integral_plane.0 + left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(width: usize, height: usize) -> PlaneMapper {
        PlaneMapper::new(width, height, Complex::new(0.0, 0.0), 1.0).unwrap()
    }

    #[test]
    fn planemapper_fails_on_empty_shape() {
        let pm = PlaneMapper::new(0, 4, Complex::new(0.0, 0.0), 1.0);
        assert!(pm.is_err());
    }

    #[test]
    fn point_to_pixel_on_unit_window() {
        let pm = unit(4, 4);
        assert_eq!(pm.point_to_pixel(&Complex::new(0.0, 0.0)), Some(Pixel(2, 2)));
        assert_eq!(pm.point_to_pixel(&Complex::new(-1.0, -1.0)), Some(Pixel(0, 0)));
        assert_eq!(pm.point_to_pixel(&Complex::new(0.99, 0.99)), Some(Pixel(3, 3)));
    }

    #[test]
    fn window_is_half_open() {
        let pm = unit(8, 8);
        assert!(pm.point_to_pixel(&Complex::new(1.0, 0.0)).is_none());
        assert!(pm.point_to_pixel(&Complex::new(0.0, 1.0)).is_none());
        assert!(pm.point_to_pixel(&Complex::new(-1.0, 0.0)).is_some());
        assert!(pm.point_to_pixel(&Complex::new(-1.0001, 0.0)).is_none());
    }

    #[test]
    fn degenerate_points_are_not_visible() {
        let pm = unit(8, 8);
        assert!(pm.point_to_offset(&Complex::new(std::f32::NAN, 0.0)).is_none());
        assert!(pm.point_to_offset(&Complex::new(0.0, std::f32::INFINITY)).is_none());
        assert!(pm
            .point_to_offset(&Complex::new(std::f32::NEG_INFINITY, 0.0))
            .is_none());
    }

    #[test]
    fn origin_and_zoom_move_the_window() {
        let pm = PlaneMapper::new(10, 10, Complex::new(5.0, 5.0), 0.5).unwrap();
        // (5,5) is the center; the window spans 2 units either side.
        assert_eq!(pm.point_to_pixel(&Complex::new(5.0, 5.0)), Some(Pixel(5, 5)));
        assert_eq!(pm.point_to_pixel(&Complex::new(3.0, 3.0)), Some(Pixel(0, 0)));
        assert!(pm.point_to_pixel(&Complex::new(7.0, 5.0)).is_none());
    }

    #[test]
    fn offsets_are_row_major() {
        let pm = unit(4, 2);
        assert_eq!(pm.point_to_offset(&Complex::new(-1.0, -1.0)), Some(0));
        assert_eq!(pm.point_to_offset(&Complex::new(0.6, 0.5)), Some(4 + 3));
    }

    #[test]
    fn pixel_to_point_inverts_point_to_pixel() {
        let pm = PlaneMapper::new(640, 480, Complex::new(0.25, -0.5), 2.0).unwrap();
        for &pixel in &[Pixel(0, 0), Pixel(320, 240), Pixel(639, 479), Pixel(17, 400)] {
            // Nudge into the pixel to dodge edge rounding.
            let p = pm.pixel_to_point(&pixel) + Complex::new(0.0001, 0.0001);
            assert_eq!(pm.point_to_pixel(&p), Some(pixel));
        }
    }
}
