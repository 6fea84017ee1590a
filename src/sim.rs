//! Simulation core
//!
//! One deterministic state machine wrapping the maze, the robot, and the
//! sensor bank. `step` advances exactly one tick: apply the drive action,
//! then read every sensor against the settled pose. Command errors and
//! collision rejections resolve inside the tick; nothing propagates past
//! the tick boundary.

use crate::config::SimulatorConfig;
use crate::error::{Error, Result};
use crate::geometry::{self, Point, Pose};
use crate::maze::Maze;
use crate::robot::{DriveBias, DriveCommand, MotionSample, Robot};
use crate::sensors::{NoiseStream, SensorBank};
use std::collections::BTreeMap;

/// What one tick should do: optionally drive
#[derive(Debug, Clone, Default)]
pub struct TickDirective {
    /// Drive action for this tick; `None` coasts
    pub drive: Option<DriveCommand>,
}

/// Everything one tick produced
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Tick index at which this state was computed
    pub tick: u64,
    /// False when the drive action was rejected or malformed
    pub accepted: bool,
    /// Command error description, if the drive action was malformed
    pub command_error: Option<String>,
    /// All sensor readings for this tick
    pub readings: BTreeMap<String, f32>,
    pub pose: Pose,
    pub perimeter: Vec<Point>,
}

/// The physical simulation: maze + robot + sensors + tick counter
pub struct Simulation {
    maze: Maze,
    robot: Robot,
    sensors: SensorBank,
    tick: u64,
}

impl Simulation {
    /// Build the simulation from configuration.
    ///
    /// The session noise stream is created here and consumed in a fixed
    /// order: the drive bias (if randomization is requested) draws first,
    /// exactly once, then the stream passes to the sensor bank. Nothing
    /// reseeds after this point, so a fixed seed reproduces the entire
    /// session.
    pub fn from_config(config: &SimulatorConfig) -> Result<Self> {
        config.validate()?;
        let maze = Maze::from_config(&config.maze)?;

        let mut noise = NoiseStream::new(config.simulation.random_seed);
        let bias = if config.drive.randomize_bias {
            let bias = DriveBias::randomized(config.drive.bias_strength, &mut noise);
            log::info!(
                "drive bias randomized: linear={:.4}, angular={:.4}",
                bias.linear,
                bias.angular
            );
            bias
        } else {
            DriveBias::neutral()
        };

        let robot = Robot::new(&config.robot, bias);
        let blocked = maze
            .walls()
            .iter()
            .any(|w| geometry::polygon_intersects_segment(robot.perimeter(), w));
        if blocked {
            return Err(Error::Config(format!(
                "robot spawn ({}, {}) intersects a maze wall",
                config.robot.start_x, config.robot.start_y
            )));
        }

        let sensors = SensorBank::from_loadout(&config.sensors, noise);

        Ok(Self {
            maze,
            robot,
            sensors,
            tick: 0,
        })
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn pose(&self) -> Pose {
        self.robot.pose()
    }

    /// Advance exactly one tick of `dt` seconds
    pub fn step(&mut self, directive: &TickDirective, dt: f32) -> TickReport {
        self.tick += 1;

        let command = directive.drive.clone().unwrap_or_else(DriveCommand::coast);
        let (accepted, command_error, sample) = match self.robot.apply(&command, dt, &self.maze) {
            Ok(outcome) => (outcome.accepted, None, outcome.sample),
            Err(e) => {
                // Malformed command: pose untouched, error carried in the report
                let still = MotionSample {
                    pose: self.robot.pose(),
                    displacement: 0.0,
                    turn: 0.0,
                };
                (false, Some(e.to_string()), still)
            }
        };

        // Sensors always run, even on rejected ticks, so integrating
        // sensors keep drifting while the robot sits still
        let readings = self.sensors.read_all(&sample, &self.maze);

        TickReport {
            tick: self.tick,
            accepted,
            command_error,
            readings,
            pose: self.robot.pose(),
            perimeter: self.robot.perimeter().to_vec(),
        }
    }
}
