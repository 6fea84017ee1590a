//! Sensor bank
//!
//! Each sensor is one implementation of the [`Sensor`] contract: it owns a
//! descriptor (identity, mount offset, error model) and produces one reading
//! per tick from the settled robot motion and the maze. Integrating sensors
//! (gyro, odometer) keep accumulated state and drift; range sensors are
//! stateless beam casts.
//!
//! All noise draws come from the single session [`NoiseStream`], in loadout
//! order, which makes a fixed seed reproduce every reading exactly.

mod gyro;
mod noise;
mod odometer;
mod range;

pub use gyro::Gyroscope;
pub use noise::NoiseStream;
pub use odometer::Odometer;
pub use range::RangeSensor;

use crate::maze::Maze;
use crate::robot::MotionSample;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Sensor kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Range,
    Gyro,
    Odom,
}

/// Noise distribution applied to a sensor reading each tick
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum NoiseModel {
    #[default]
    None,
    Gaussian { stddev: f32 },
    Uniform { half_width: f32 },
}

impl NoiseModel {
    /// Draw one sample from the configured distribution
    pub fn sample(&self, stream: &mut NoiseStream) -> f32 {
        match self {
            NoiseModel::None => 0.0,
            NoiseModel::Gaussian { stddev } => stream.gaussian(*stddev),
            NoiseModel::Uniform { half_width } => stream.uniform_signed(*half_width),
        }
    }
}

/// Static sensor description: identity, mount, and error model
#[derive(Debug, Clone, Deserialize)]
pub struct SensorDescriptor {
    /// Unique sensor id, the key under which readings are reported
    pub id: String,

    /// Sensor kind
    pub kind: SensorKind,

    /// Mount X offset in the body frame (forward positive)
    #[serde(default)]
    pub mount_x: f32,

    /// Mount Y offset in the body frame (left positive)
    #[serde(default)]
    pub mount_y: f32,

    /// Mount heading offset relative to the body forward axis (radians)
    #[serde(default)]
    pub mount_heading: f32,

    /// Systematic per-tick bias added to the reading
    #[serde(default)]
    pub bias: f32,

    /// Per-tick noise distribution
    #[serde(default)]
    pub noise: NoiseModel,

    /// Maximum detection range (range sensors only, maze units)
    #[serde(default = "default_max_range")]
    pub max_range: f32,
}

fn default_max_range() -> f32 {
    60.0
}

/// One sensor instance: a descriptor plus per-tick read behavior
pub trait Sensor: Send {
    fn descriptor(&self) -> &SensorDescriptor;

    /// Produce this tick's reading from the settled motion sample.
    ///
    /// Units per kind: range = maze units, gyro = radians accumulated,
    /// odom = maze units accumulated.
    fn read(&mut self, sample: &MotionSample, maze: &Maze, noise: &mut NoiseStream) -> f32;
}

/// The full sensor loadout plus the session noise stream
pub struct SensorBank {
    sensors: Vec<Box<dyn Sensor>>,
    noise: NoiseStream,
}

impl SensorBank {
    /// Instantiate every descriptor in loadout order
    pub fn from_loadout(descriptors: &[SensorDescriptor], noise: NoiseStream) -> Self {
        let sensors = descriptors
            .iter()
            .map(|d| -> Box<dyn Sensor> {
                match d.kind {
                    SensorKind::Range => Box::new(RangeSensor::new(d.clone())),
                    SensorKind::Gyro => Box::new(Gyroscope::new(d.clone())),
                    SensorKind::Odom => Box::new(Odometer::new(d.clone())),
                }
            })
            .collect();
        Self { sensors, noise }
    }

    /// Read every sensor once, after kinematics have settled for the tick.
    ///
    /// Sensors are read in loadout order so the noise stream is consumed
    /// deterministically.
    pub fn read_all(&mut self, sample: &MotionSample, maze: &Maze) -> BTreeMap<String, f32> {
        let mut readings = BTreeMap::new();
        for sensor in &mut self.sensors {
            let value = sensor.read(sample, maze, &mut self.noise);
            readings.insert(sensor.descriptor().id.clone(), value);
        }
        readings
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
