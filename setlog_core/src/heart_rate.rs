//! Simulated heart rate for sessions without a sensor attached.
//!
//! Purely cosmetic: a bounded random walk the front end can display.

use crate::config::HeartRateConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest change between two samples, in bpm
const MAX_STEP: i64 = 5;

#[derive(Debug)]
pub struct HeartRateSimulator {
    bpm: u32,
    min_bpm: u32,
    max_bpm: u32,
    rng: StdRng,
}

impl HeartRateSimulator {
    pub fn new(config: &HeartRateConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn seeded(config: &HeartRateConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &HeartRateConfig, rng: StdRng) -> Self {
        let min_bpm = config.min_bpm.min(config.max_bpm);
        let max_bpm = config.max_bpm.max(config.min_bpm);
        Self {
            bpm: config.resting_bpm.clamp(min_bpm, max_bpm),
            min_bpm,
            max_bpm,
            rng,
        }
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Take one step of the walk and return the new value
    pub fn sample(&mut self) -> u32 {
        let step = self.rng.gen_range(-MAX_STEP..=MAX_STEP);
        let next = (self.bpm as i64 + step).clamp(self.min_bpm as i64, self.max_bpm as i64);
        self.bpm = next as u32;
        self.bpm
    }

    pub fn reset(&mut self, resting_bpm: u32) {
        self.bpm = resting_bpm.clamp(self.min_bpm, self.max_bpm);
    }
}
