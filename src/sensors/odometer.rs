//! Integrating odometer
//!
//! The linear-displacement analogue of the gyroscope: accumulates the true
//! signed arc length traveled each tick plus bias and noise.

use super::{NoiseStream, Sensor, SensorDescriptor};
use crate::maze::Maze;
use crate::robot::MotionSample;

/// Odometer with accumulated distance estimate (maze units)
pub struct Odometer {
    descriptor: SensorDescriptor,
    accumulated: f32,
}

impl Odometer {
    pub fn new(descriptor: SensorDescriptor) -> Self {
        Self {
            descriptor,
            accumulated: 0.0,
        }
    }
}

impl Sensor for Odometer {
    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn read(&mut self, sample: &MotionSample, _maze: &Maze, noise: &mut NoiseStream) -> f32 {
        self.accumulated +=
            sample.displacement + self.descriptor.bias + self.descriptor.noise.sample(noise);
        self.accumulated
    }
}
