use std::time::{SystemTime, UNIX_EPOCH};

use crate::raster::{RasterBuffer, to_channel};

/// Peak-to-peak grain amplitude at noise 100.
const MAX_INTENSITY: f64 = 50.0;

const MINSTD_MODULUS: u64 = 2_147_483_647;
const MINSTD_MULTIPLIER: u64 = 48_271;

/// Source of uniform samples for film grain.
pub trait NoiseSource: Send {
    /// Next sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// MINSTD linear congruential generator.
///
/// Deterministic for a given seed, which is what tests want. Use
/// [`SeededNoise::from_clock`] for the grain shown to users.
#[derive(Clone, Debug)]
pub struct SeededNoise {
    state: u64,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        // State must stay in [1, modulus - 1]
        let state = seed % (MINSTD_MODULUS - 1) + 1;
        Self { state }
    }

    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos)
    }
}

impl Default for SeededNoise {
    fn default() -> Self {
        Self::from_clock()
    }
}

impl NoiseSource for SeededNoise {
    fn next_unit(&mut self) -> f64 {
        self.state = self.state * MINSTD_MULTIPLIER % MINSTD_MODULUS;
        (self.state - 1) as f64 / (MINSTD_MODULUS - 1) as f64
    }
}

/// Add uniform grain in `[-intensity / 2, intensity / 2]` to each color
/// channel independently, with `intensity = value / 100 * 50`.
pub fn noise(buf: &mut RasterBuffer, value: f32, source: &mut dyn NoiseSource) {
    if value == 0.0 {
        return;
    }

    let intensity = value as f64 / 100.0 * MAX_INTENSITY;
    for pixel in buf.data.chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            let grain = (source.next_unit() - 0.5) * intensity;
            *channel = to_channel(*channel as f64 + grain);
        }
    }
}
