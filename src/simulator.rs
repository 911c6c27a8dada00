//! Probabilistic loss injection for exercising the recovery logic.
//!
//! Real networks drop packets; loopback does not.  The server therefore runs
//! every inbound request and every outbound answer through a
//! [`LossSimulator`], which drops each independently with a configured
//! probability.
//!
//! Simulators are seedable so failing runs are reproducible, and scriptable
//! so scenario tests can force exact drop patterns ("lose only the first
//! request") instead of sampling until the pattern happens to occur.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides, one datagram at a time, whether it should be silently dropped.
#[derive(Debug)]
pub struct LossSimulator {
    probability: f64,
    source: DropSource,
}

#[derive(Debug)]
enum DropSource {
    Random(StdRng),
    /// Fixed verdict sequence; pass-through once exhausted.
    Script(VecDeque<bool>),
}

impl LossSimulator {
    /// Drop with `probability` (clamped to `0.0..=1.0`), entropy-seeded.
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            source: DropSource::Random(StdRng::from_entropy()),
        }
    }

    /// Drop with `probability`, drawing from a fixed seed.
    pub fn with_seed(probability: f64, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            source: DropSource::Random(StdRng::seed_from_u64(seed)),
        }
    }

    /// Drop exactly per `verdicts`, then pass everything through.
    pub fn scripted<I: IntoIterator<Item = bool>>(verdicts: I) -> Self {
        Self {
            probability: 0.0,
            source: DropSource::Script(verdicts.into_iter().collect()),
        }
    }

    /// Transparent pass-through (no loss).
    pub fn passthrough() -> Self {
        Self::new(0.0)
    }

    /// `true` when the current datagram should be dropped.
    pub fn should_drop(&mut self) -> bool {
        match &mut self.source {
            DropSource::Random(rng) => rng.gen::<f64>() < self.probability,
            DropSource::Script(verdicts) => verdicts.pop_front().unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_probability_never_drops() {
        let mut sim = LossSimulator::with_seed(0.0, 7);
        assert!((0..1000).all(|_| !sim.should_drop()));
    }

    #[test]
    fn full_probability_always_drops() {
        let mut sim = LossSimulator::with_seed(1.0, 7);
        assert!((0..1000).all(|_| sim.should_drop()));
    }

    #[test]
    fn same_seed_same_verdicts() {
        let mut a = LossSimulator::with_seed(0.5, 42);
        let mut b = LossSimulator::with_seed(0.5, 42);
        let va: Vec<bool> = (0..100).map(|_| a.should_drop()).collect();
        let vb: Vec<bool> = (0..100).map(|_| b.should_drop()).collect();
        assert_eq!(va, vb);
    }

    #[test]
    fn script_is_followed_then_passes_through() {
        let mut sim = LossSimulator::scripted([true, false, true]);
        assert!(sim.should_drop());
        assert!(!sim.should_drop());
        assert!(sim.should_drop());
        assert!(!sim.should_drop());
        assert!(!sim.should_drop());
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let mut always = LossSimulator::with_seed(1.5, 1);
        assert!(always.should_drop());
        let mut never = LossSimulator::with_seed(-0.5, 1);
        assert!(!never.should_drop());
    }
}
