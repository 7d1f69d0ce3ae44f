// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A small integer-hash random source.
//!
//! Every chaos-game worker owns one of these.  It has to be cheap,
//! seedable from a plain `u32`, and reproduce the same stream for the
//! same seed on every run, because frames are re-seeded from the
//! frame counter and a worker index rather than carried over.  The
//! generator is a PCG-style hash: an LCG advance followed by an
//! xor-shift/multiply output permutation.

const MULTIPLIER: u32 = 747_796_405;
const INCREMENT: u32 = 2_891_336_453;
const PERMUTE: u32 = 277_803_737;

/// The stateless hash at the heart of the generator.  Also used to
/// derive per-worker seeds from the frame number and worker index.
#[inline]
pub fn hash(input: u32) -> u32 {
    let state = input.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(PERMUTE);
    (word >> 22) ^ word
}

/// Deterministic, seedable pseudo-random stream.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomSource {
    state: u32,
}

impl RandomSource {
    /// A fresh source seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        RandomSource { state: seed }
    }

    /// The seed a chaos-game worker uses for a given frame.
    pub fn for_worker(frame: u32, worker: u32) -> Self {
        RandomSource::new(hash(frame) ^ hash(worker))
    }

    /// Reset the stream.
    pub fn seed(&mut self, seed: u32) {
        self.state = seed;
    }

    /// Advance and return a full-width value.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        self.state = hash(self.state);
        self.state
    }

    /// A float in `[0, 1)`, built from the top 24 bits so every value
    /// is exactly representable.
    #[inline]
    pub fn next_float(&mut self) -> f32 {
        (self.next() >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_replays_same_stream() {
        let mut a = RandomSource::new(0xdead_beef);
        let mut b = RandomSource::new(0xdead_beef);
        for _ in 0..100_000 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn reseeding_restarts_the_stream() {
        let mut a = RandomSource::new(7);
        let first: Vec<u32> = (0..16).map(|_| a.next()).collect();
        a.seed(7);
        let second: Vec<u32> = (0..16).map(|_| a.next()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn different_workers_diverge() {
        let mut a = RandomSource::for_worker(3, 0);
        let mut b = RandomSource::for_worker(3, 1);
        let same = (0..1000).filter(|_| a.next() == b.next()).count();
        assert!(same < 5, "{} collisions", same);
    }

    #[test]
    fn zero_seed_is_not_a_fixed_point() {
        let mut a = RandomSource::new(0);
        let x = a.next();
        let y = a.next();
        assert_ne!(x, 0);
        assert_ne!(x, y);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut a = RandomSource::new(12345);
        let mut sum = 0.0f64;
        for _ in 0..50_000 {
            let f = a.next_float();
            assert!(f >= 0.0 && f < 1.0, "{} out of range", f);
            sum += f as f64;
        }
        let mean = sum / 50_000.0;
        assert!((mean - 0.5).abs() < 0.02, "mean {}", mean);
    }
}
