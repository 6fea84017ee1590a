//! Discrete-beam range sensor
//!
//! Casts a single ray from its mount point (transformed by the current
//! pose) along its mount-relative heading against the maze walls. The true
//! distance is clipped to the configured maximum range before the error
//! model is applied.

use super::{NoiseStream, Sensor, SensorDescriptor};
use crate::geometry::{self, Point};
use crate::maze::Maze;
use crate::robot::MotionSample;

/// Instantaneous range sensor; no state persists between ticks
pub struct RangeSensor {
    descriptor: SensorDescriptor,
}

impl RangeSensor {
    pub fn new(descriptor: SensorDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Sensor for RangeSensor {
    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    fn read(&mut self, sample: &MotionSample, maze: &Maze, noise: &mut NoiseStream) -> f32 {
        let d = &self.descriptor;
        let mount = sample.pose.transform(Point::new(d.mount_x, d.mount_y));
        let heading = sample.pose.heading + d.mount_heading;

        let true_range = geometry::cast_ray(mount, heading, d.max_range, maze.walls());
        let reading = true_range + d.bias + d.noise.sample(noise);
        reading.max(0.0)
    }
}
