// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The iterated function system: an ordered list of xforms plus the
//! global parameters that shape how the chaos game plots them.
//!
//! Every mutating call validates before it touches anything, so a
//! rejected call leaves the fractal exactly as it was.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{FlameError, Result};
use crate::planes::Point;
use crate::variations::Variation;
use crate::xform::{Affine, XForm};

/// The most xforms a fractal may hold.
pub const MAX_XFORMS: usize = 128;

/// Variations the random generator likes, and how much.
const GENERATOR_PREFERENCES: [(Variation, u32); 12] = [
    (Variation::Linear, 6),
    (Variation::Sinusoidal, 4),
    (Variation::Spherical, 4),
    (Variation::Swirl, 3),
    (Variation::Julia, 4),
    (Variation::Horseshoe, 2),
    (Variation::Polar, 2),
    (Variation::Disc, 2),
    (Variation::Heart, 1),
    (Variation::Bubble, 2),
    (Variation::Eyefish, 1),
    (Variation::Blur, 1),
];

/// An ordered collection of xforms with its symmetry, post-transform
/// and view parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fractal {
    xforms: Vec<XForm>,
    final_xform: Option<usize>,
    color_final_xform: Option<usize>,
    /// Order of the rotational symmetry; 1 (or 0) means none.
    pub rotation_order: u32,
    /// Mirror across the y axis (negate x).
    pub mirror_x: bool,
    /// Mirror across the x axis (negate y).
    pub mirror_y: bool,
    /// Scale from the flame's plane to the window.
    pub zoom: f32,
    /// Point shown at the center of the window, and the pivot for both
    /// mirroring and rotational symmetry.
    pub origin: (f32, f32),
}

impl Default for Fractal {
    fn default() -> Self {
        Fractal::new()
    }
}

impl Fractal {
    /// An empty fractal with an identity view.
    pub fn new() -> Self {
        Fractal {
            xforms: Vec::new(),
            final_xform: None,
            color_final_xform: None,
            rotation_order: 1,
            mirror_x: false,
            mirror_y: false,
            zoom: 1.0,
            origin: (0.0, 0.0),
        }
    }

    /// A fractal built from a list of xforms, checked for capacity.
    pub fn with_xforms(xforms: Vec<XForm>) -> Result<Self> {
        if xforms.len() > MAX_XFORMS {
            return Err(FlameError::CapacityExceeded {
                what: "xform",
                max: MAX_XFORMS,
            });
        }
        Ok(Fractal {
            xforms,
            ..Fractal::new()
        })
    }

    /// Generate a random flame: a handful of xforms with random affine
    /// coefficients and colours, variations drawn by preference, and
    /// random symmetry.  Final and colour-final xforms, when present,
    /// are picked by xform weight.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let table = WeightedIndex::new(GENERATOR_PREFERENCES.iter().map(|&(_, w)| w))
            .expect("generator preference weights are positive");
        let count = rng.gen_range(2..=5);
        let xforms = (0..count)
            .map(|_| {
                let affine = Affine::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                let variation = GENERATOR_PREFERENCES[table.sample(rng)].0;
                XForm::new(variation, affine, rng.gen(), rng.gen_range(0.1..1.0))
            })
            .collect();

        let mut fractal = Fractal {
            xforms,
            rotation_order: rng.gen_range(1..=4),
            mirror_x: rng.gen_bool(0.25),
            mirror_y: rng.gen_bool(0.25),
            zoom: 0.5,
            ..Fractal::new()
        };
        if rng.gen_bool(0.3) {
            fractal.final_xform = fractal.pick_weighted(rng);
        }
        if rng.gen_bool(0.3) {
            fractal.color_final_xform = fractal.pick_weighted(rng);
        }
        fractal
    }

    /// Pick an xform index with probability proportional to its weight.
    /// `None` when there are no xforms or every weight is zero.
    ///
    /// The chaos game doesn't use this: it selects uniformly.  This is
    /// for generators, and is where weighted runtime selection would
    /// hook in.
    pub fn pick_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        WeightedIndex::new(self.xforms.iter().map(|x| x.weight))
            .ok()
            .map(|dist| dist.sample(rng))
    }

    /// The xforms, in evaluation order.
    pub fn xforms(&self) -> &[XForm] {
        &self.xforms
    }

    /// Mutable access to one xform.  Its index can't change through
    /// this, so the final-xform invariants hold.
    pub fn xform_mut(&mut self, index: usize) -> Option<&mut XForm> {
        self.xforms.get_mut(index)
    }

    /// Number of xforms.
    pub fn len(&self) -> usize {
        self.xforms.len()
    }

    /// True when there's nothing to iterate.
    pub fn is_empty(&self) -> bool {
        self.xforms.is_empty()
    }

    /// Append an xform, returning its index.
    pub fn push(&mut self, xform: XForm) -> Result<usize> {
        if self.xforms.len() >= MAX_XFORMS {
            return Err(FlameError::CapacityExceeded {
                what: "xform",
                max: MAX_XFORMS,
            });
        }
        self.xforms.push(xform);
        Ok(self.xforms.len() - 1)
    }

    /// Remove the xform at `index`.  A final or colour-final reference
    /// to it is dropped; references past it shift down with the list.
    pub fn remove(&mut self, index: usize) -> Result<XForm> {
        self.check_index(index)?;
        let fix = |slot: Option<usize>| match slot {
            Some(i) if i == index => None,
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        self.final_xform = fix(self.final_xform);
        self.color_final_xform = fix(self.color_final_xform);
        Ok(self.xforms.remove(index))
    }

    /// The xform re-applied to every plotted position, if any.
    pub fn final_xform(&self) -> Option<usize> {
        self.final_xform
    }

    /// The xform whose colour is blended into every plotted colour, if
    /// any.
    pub fn color_final_xform(&self) -> Option<usize> {
        self.color_final_xform
    }

    /// Set or clear the final xform.
    pub fn set_final_xform(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        self.final_xform = index;
        Ok(())
    }

    /// Set or clear the colour-final xform.
    pub fn set_color_final_xform(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        self.color_final_xform = index;
        Ok(())
    }

    /// The view origin as a point.
    pub fn origin_point(&self) -> Point {
        Point::new(self.origin.0, self.origin.1)
    }

    /// Move every animated xform to its pose for `frame`.
    pub fn animate(&mut self, frame: u32, speed: f32) {
        for xform in self.xforms.iter_mut() {
            xform.animate(frame, speed);
        }
    }

    /// Check the invariants a deserialized fractal can't promise:
    /// capacity, final-xform indices, and non-negative weights.
    pub fn validate(&self) -> Result<()> {
        if self.xforms.len() > MAX_XFORMS {
            return Err(FlameError::CapacityExceeded {
                what: "xform",
                max: MAX_XFORMS,
            });
        }
        if let Some((index, xform)) = self
            .xforms
            .iter()
            .enumerate()
            .find(|(_, x)| x.weight.is_nan() || x.weight < 0.0)
        {
            return Err(FlameError::InvalidWeight {
                index,
                weight: xform.weight,
            });
        }
        for slot in [self.final_xform, self.color_final_xform].iter() {
            if let Some(i) = *slot {
                self.check_index(i)?;
            }
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.xforms.len() {
            Ok(())
        } else {
            Err(FlameError::InvalidIndex {
                index,
                len: self.xforms.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn linear(color: f32) -> XForm {
        XForm::new(Variation::Linear, Affine::identity(), color, 1.0)
    }

    fn three() -> Fractal {
        Fractal::with_xforms(vec![linear(0.0), linear(0.5), linear(1.0)]).unwrap()
    }

    #[test]
    fn push_rejects_past_capacity_and_leaves_state() {
        let mut f = Fractal::new();
        for i in 0..MAX_XFORMS {
            assert_eq!(f.push(linear(0.0)).unwrap(), i);
        }
        let before = f.clone();
        match f.push(linear(1.0)) {
            Err(FlameError::CapacityExceeded { max, .. }) => assert_eq!(max, MAX_XFORMS),
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }
        assert_eq!(f, before);
    }

    #[test]
    fn with_xforms_checks_capacity() {
        let too_many = vec![linear(0.0); MAX_XFORMS + 1];
        assert!(Fractal::with_xforms(too_many).is_err());
    }

    #[test]
    fn final_indices_must_exist() {
        let mut f = three();
        assert!(f.set_final_xform(Some(2)).is_ok());
        assert!(f.set_final_xform(Some(3)).is_err());
        assert_eq!(f.final_xform(), Some(2));
        assert!(f.set_color_final_xform(Some(7)).is_err());
        assert_eq!(f.color_final_xform(), None);
        f.set_final_xform(None).unwrap();
        assert_eq!(f.final_xform(), None);
    }

    #[test]
    fn removal_keeps_final_indices_pointing_at_the_same_xform() {
        let mut f = three();
        f.set_final_xform(Some(2)).unwrap();
        f.set_color_final_xform(Some(1)).unwrap();
        let removed = f.remove(0).unwrap();
        assert_eq!(removed.color, 0.0);
        assert_eq!(f.final_xform(), Some(1));
        assert_eq!(f.color_final_xform(), Some(0));
        assert_eq!(f.xforms()[1].color, 1.0);

        f.remove(1).unwrap();
        assert_eq!(f.final_xform(), None);
        assert_eq!(f.color_final_xform(), Some(0));
    }

    #[test]
    fn remove_out_of_range_is_an_error() {
        let mut f = three();
        assert!(f.remove(3).is_err());
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn validate_catches_dangling_indices() {
        let mut f = three();
        f.final_xform = Some(9);
        assert!(f.validate().is_err());
        f.final_xform = Some(1);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_and_nan_weights() {
        let mut f = three();
        f.xform_mut(1).unwrap().weight = -0.5;
        match f.validate() {
            Err(FlameError::InvalidWeight { index, weight }) => {
                assert_eq!(index, 1);
                assert_eq!(weight, -0.5);
            }
            other => panic!("expected InvalidWeight, got {:?}", other),
        }
        f.xform_mut(1).unwrap().weight = f32::NAN;
        assert!(f.validate().is_err());
        f.xform_mut(1).unwrap().weight = 0.0;
        assert!(f.validate().is_ok());
    }

    #[test]
    fn random_fractals_are_valid_and_reproducible() {
        let a = Fractal::random(&mut StdRng::seed_from_u64(7));
        let b = Fractal::random(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.len() >= 2 && a.len() <= 5);
        assert!(a.rotation_order >= 1 && a.rotation_order <= 4);
        assert!(a.validate().is_ok());
        for x in a.xforms() {
            assert!(x.weight > 0.0);
            assert!(x.color >= 0.0 && x.color < 1.0);
        }
    }

    #[test]
    fn weighted_pick_follows_weights() {
        let mut f = three();
        f.xform_mut(0).unwrap().weight = 0.0;
        f.xform_mut(1).unwrap().weight = 0.0;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(f.pick_weighted(&mut rng), Some(2));
        }
        assert_eq!(Fractal::new().pick_weighted(&mut rng), None);
    }

    #[test]
    fn animate_reaches_every_xform() {
        let mut f = three();
        for i in 0..3 {
            f.xform_mut(i).unwrap().set_animate_x(true);
        }
        f.animate(100, 1.0);
        for x in f.xforms() {
            assert!(x.affine.a < 1.0);
        }
    }
}
