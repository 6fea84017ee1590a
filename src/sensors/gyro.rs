//! Integrating gyroscope
//!
//! Accumulates the true per-tick heading change plus a constant bias and a
//! noise sample. The accumulated value is the reading, so error drifts
//! monotonically in expectation with the sign of the bias.

use super::{NoiseStream, Sensor, SensorDescriptor};
use crate::maze::Maze;
use crate::robot::MotionSample;

/// Gyroscope with accumulated heading estimate (radians)
pub struct Gyroscope {
    descriptor: SensorDescriptor,
    accumulated: f32,
}

impl Gyroscope {
    pub fn new(descriptor: SensorDescriptor) -> Self {
        Self {
            descriptor,
            accumulated: 0.0,
        }
    }
}

impl Sensor for Gyroscope {
    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn read(&mut self, sample: &MotionSample, _maze: &Maze, noise: &mut NoiseStream) -> f32 {
        self.accumulated += sample.turn + self.descriptor.bias + self.descriptor.noise.sample(noise);
        self.accumulated
    }
}
