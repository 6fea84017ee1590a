//! Simulator configuration
//!
//! Loads the full simulator description from a TOML file: maze layout,
//! robot body and drive limits, sensor loadout, error-seed policy, and the
//! control protocol endpoint. Every parameter has a default matching the
//! classroom maze (96x48 units, 12-unit cells), so a minimal file runs.
//!
//! Example configuration:
//!
//! ```toml
//! [maze]
//! cells_x = 8
//! cells_y = 4
//! cell_size = 12.0
//! walls = [[24.0, 0.0, 24.0, 24.0], [48.0, 24.0, 48.0, 48.0]]
//!
//! [robot]
//! start_x = 6.0
//! start_y = 6.0
//! start_heading = 0.0
//!
//! [drive]
//! randomize_bias = true
//! bias_strength = 0.05
//!
//! [[sensors]]
//! id = "range0"
//! kind = "range"
//! mount_x = 3.0
//! max_range = 60.0
//! noise = { model = "gaussian", stddev = 0.2 }
//!
//! [[sensors]]
//! id = "gyro0"
//! kind = "gyro"
//! bias = 0.001
//!
//! [simulation]
//! tick_hz = 20.0
//! random_seed = 42      # 0 = entropy-seeded each run
//! pacing = "client"
//!
//! [network]
//! bind_address = "127.0.0.1:9000"
//! wire_format = "json"
//! ```

use crate::error::{Error, Result};
use crate::sensors::{NoiseModel, SensorDescriptor, SensorKind};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level simulator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub maze: MazeConfig,

    #[serde(default)]
    pub robot: RobotConfig,

    #[serde(default)]
    pub drive: DriveConfig,

    /// Sensor loadout; defaults to one forward range sensor, one gyro,
    /// and one odometer
    #[serde(default = "default_sensor_loadout")]
    pub sensors: Vec<SensorDescriptor>,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Maze layout: boundary cells plus interior wall segments and floor tiles
#[derive(Debug, Clone, Deserialize)]
pub struct MazeConfig {
    /// Maze width in cells
    #[serde(default = "default_cells_x")]
    pub cells_x: usize,

    /// Maze height in cells
    #[serde(default = "default_cells_y")]
    pub cells_y: usize,

    /// Cell edge length (maze units)
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,

    /// Interior wall segments as [x1, y1, x2, y2]
    #[serde(default)]
    pub walls: Vec<[f32; 4]>,

    /// Optional explicit boundary polygon as [x, y] vertices; when absent
    /// the rectangular cell extent is used
    #[serde(default)]
    pub boundary: Option<Vec<[f32; 2]>>,

    /// Optional explicit floor rows ('0' = light, '1' = dark), bottom row
    /// first; when absent a checkerboard is generated
    #[serde(default)]
    pub floor_rows: Option<Vec<String>>,
}

fn default_cells_x() -> usize {
    8
}
fn default_cells_y() -> usize {
    4
}
fn default_cell_size() -> f32 {
    12.0
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            cells_x: default_cells_x(),
            cells_y: default_cells_y(),
            cell_size: default_cell_size(),
            walls: Vec::new(),
            boundary: None,
            floor_rows: None,
        }
    }
}

/// Collision response policy applied to drive commands
///
/// `Reject` is the default: a tick that would intersect a wall leaves the
/// pose untouched. `Slide` retries the translation axis by axis and is an
/// explicit opt-in variant, never a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    #[default]
    Reject,
    Slide,
}

/// Robot body shape and drive limits
#[derive(Debug, Clone, Deserialize)]
pub struct RobotConfig {
    /// Body-shape template as [x, y] vertices in the body frame
    /// (x forward, y left, origin at the drive center)
    #[serde(default = "default_body")]
    pub body: Vec<[f32; 2]>,

    /// Spawn X position (maze units)
    #[serde(default = "default_start_x")]
    pub start_x: f32,

    /// Spawn Y position (maze units)
    #[serde(default = "default_start_y")]
    pub start_y: f32,

    /// Spawn heading (radians, CCW from +X)
    #[serde(default)]
    pub start_heading: f32,

    /// Maximum linear velocity (units/s)
    #[serde(default = "default_max_linear_speed")]
    pub max_linear_speed: f32,

    /// Maximum angular velocity (rad/s)
    #[serde(default = "default_max_angular_speed")]
    pub max_angular_speed: f32,

    /// Distance between wheel centers, used by tank-style commands
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f32,

    /// Collision response policy
    #[serde(default)]
    pub collision: CollisionPolicy,
}

fn default_body() -> Vec<[f32; 2]> {
    // 9x6 chassis, forward-biased like the classroom robot
    vec![[4.5, -3.0], [4.5, 3.0], [-4.5, 3.0], [-4.5, -3.0]]
}
fn default_start_x() -> f32 {
    6.0
}
fn default_start_y() -> f32 {
    6.0
}
fn default_max_linear_speed() -> f32 {
    24.0
}
fn default_max_angular_speed() -> f32 {
    3.0
}
fn default_wheel_base() -> f32 {
    6.0
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            body: default_body(),
            start_x: default_start_x(),
            start_y: default_start_y(),
            start_heading: 0.0,
            max_linear_speed: default_max_linear_speed(),
            max_angular_speed: default_max_angular_speed(),
            wheel_base: default_wheel_base(),
            collision: CollisionPolicy::Reject,
        }
    }
}

/// Drive bias (systematic actuator miscalibration)
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Randomize the per-actuator bias once at start-up
    #[serde(default)]
    pub randomize_bias: bool,

    /// Half-width of the uniform bias factor interval [1-s, 1+s]
    #[serde(default = "default_bias_strength")]
    pub bias_strength: f32,
}

fn default_bias_strength() -> f32 {
    0.05
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            randomize_bias: false,
            bias_strength: default_bias_strength(),
        }
    }
}

/// Tick pacing policy for the control protocol
///
/// `Client` couples simulation time to protocol turns: the scheduler waits
/// (in bounded slices, so the stop flag stays live) until the connected
/// client submits a command. `FreeRunning` substitutes a coast command when
/// no command has arrived by the tick deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pacing {
    #[default]
    Client,
    FreeRunning,
}

/// Scheduler timing and error-reproducibility policy
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Simulation tick rate (Hz)
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f32,

    /// Seed for the session noise stream (0 = entropy-seeded each run)
    #[serde(default)]
    pub random_seed: u64,

    /// Tick pacing policy
    #[serde(default)]
    pub pacing: Pacing,
}

fn default_tick_hz() -> f32 {
    20.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            random_seed: 0,
            pacing: Pacing::Client,
        }
    }
}

/// Wire payload encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Human-readable, easy to debug from any client language
    #[default]
    Json,
    /// Compact binary for high tick rates
    Postcard,
}

/// Control protocol endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// TCP bind address for the command/response session
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Wire payload encoding
    #[serde(default)]
    pub wire_format: WireFormat,
}

fn default_bind_address() -> String {
    "127.0.0.1:9000".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            wire_format: WireFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_sensor_loadout() -> Vec<SensorDescriptor> {
    vec![
        SensorDescriptor {
            id: "range0".to_string(),
            kind: SensorKind::Range,
            mount_x: 3.375,
            mount_y: 0.0,
            mount_heading: 0.0,
            bias: 0.0,
            noise: NoiseModel::Gaussian { stddev: 0.2 },
            max_range: 60.0,
        },
        SensorDescriptor {
            id: "gyro0".to_string(),
            kind: SensorKind::Gyro,
            mount_x: 0.0,
            mount_y: 0.0,
            mount_heading: 0.0,
            bias: 0.001,
            noise: NoiseModel::Gaussian { stddev: 0.002 },
            max_range: 0.0,
        },
        SensorDescriptor {
            id: "odom0".to_string(),
            kind: SensorKind::Odom,
            mount_x: 0.0,
            mount_y: 0.0,
            mount_heading: 0.0,
            bias: 0.002,
            noise: NoiseModel::Gaussian { stddev: 0.01 },
            max_range: 0.0,
        },
    ]
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            maze: MazeConfig::default(),
            robot: RobotConfig::default(),
            drive: DriveConfig::default(),
            sensors: default_sensor_loadout(),
            simulation: SimulationConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: SimulatorConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.simulation.tick_hz <= 0.0 {
            return Err(Error::Config(format!(
                "tick_hz must be positive, got {}",
                self.simulation.tick_hz
            )));
        }
        if self.robot.body.len() < 3 {
            return Err(Error::Config(format!(
                "robot body needs at least 3 vertices, got {}",
                self.robot.body.len()
            )));
        }
        if self.robot.wheel_base <= 0.0 {
            return Err(Error::Config("wheel_base must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.drive.bias_strength) {
            return Err(Error::Config(format!(
                "bias_strength must be in [0, 1), got {}",
                self.drive.bias_strength
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for sensor in &self.sensors {
            if !seen.insert(sensor.id.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate sensor id '{}'",
                    sensor.id
                )));
            }
            if sensor.kind == SensorKind::Range && sensor.max_range <= 0.0 {
                return Err(Error::Config(format!(
                    "range sensor '{}' needs a positive max_range",
                    sensor.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulatorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.maze.cells_x, 8);
        assert_eq!(config.sensors.len(), 3);
        assert_eq!(config.simulation.pacing, Pacing::Client);
    }

    #[test]
    fn test_minimal_toml() {
        let config: SimulatorConfig = toml::from_str("").unwrap();
        config.validate().unwrap();
        assert_eq!(config.network.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_full_toml() {
        let toml_content = r#"
[maze]
cells_x = 4
cells_y = 4
cell_size = 10.0
walls = [[10.0, 0.0, 10.0, 20.0]]

[robot]
start_x = 5.0
start_y = 5.0
collision = "slide"

[drive]
randomize_bias = true
bias_strength = 0.1

[[sensors]]
id = "front"
kind = "range"
mount_x = 2.0
max_range = 40.0
noise = { model = "uniform", half_width = 0.5 }

[simulation]
tick_hz = 50.0
random_seed = 7
pacing = "free-running"

[network]
bind_address = "0.0.0.0:9100"
wire_format = "postcard"
"#;
        let config: SimulatorConfig = toml::from_str(toml_content).unwrap();
        config.validate().unwrap();
        assert_eq!(config.maze.cells_x, 4);
        assert_eq!(config.robot.collision, CollisionPolicy::Slide);
        assert_eq!(config.simulation.pacing, Pacing::FreeRunning);
        assert_eq!(config.network.wire_format, WireFormat::Postcard);
        assert_eq!(config.sensors.len(), 1);
        assert_eq!(config.sensors[0].id, "front");
    }

    #[test]
    fn test_unknown_pacing_rejected() {
        let toml_content = r#"
[simulation]
pacing = "warp-speed"
"#;
        assert!(toml::from_str::<SimulatorConfig>(toml_content).is_err());
    }

    #[test]
    fn test_duplicate_sensor_id_rejected() {
        let toml_content = r#"
[[sensors]]
id = "s"
kind = "gyro"

[[sensors]]
id = "s"
kind = "odom"
"#;
        let config: SimulatorConfig = toml::from_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let toml_content = r#"
[simulation]
tick_hz = 0.0
"#;
        let config: SimulatorConfig = toml::from_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }
}
