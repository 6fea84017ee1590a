//! Session noise stream
//!
//! One seeded pseudorandom stream feeds every stochastic draw of a session:
//! drive-bias randomization at start-up, then per-tick sensor noise. The
//! seed (or the decision to seed from entropy) is fixed before the first
//! tick and the stream is never reseeded mid-session, so a fixed seed
//! reproduces the full session trace.

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;

/// Seeded noise stream shared by drive bias and all sensors
pub struct NoiseStream {
    rng: SmallRng,
}

impl NoiseStream {
    /// Create a noise stream.
    ///
    /// Seed 0 requests entropy seeding (non-reproducible); any other value
    /// gives a deterministic stream.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// Zero-mean Gaussian sample with the given standard deviation
    #[inline]
    pub fn gaussian(&mut self, stddev: f32) -> f32 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f32 = self.rng.sample(StandardNormal);
        n * stddev
    }

    /// Uniform sample in [-half_width, half_width)
    #[inline]
    pub fn uniform_signed(&mut self, half_width: f32) -> f32 {
        if half_width == 0.0 {
            return 0.0;
        }
        (self.rng.gen::<f32>() * 2.0 - 1.0) * half_width
    }
}
