//! Robot kinematics
//!
//! Maintains the pose and the derived perimeter polygon, and applies one
//! drive command per tick. Integration uses exact differential-drive arc
//! kinematics; a candidate pose whose perimeter would intersect a maze wall
//! is rejected outright (all-or-nothing, the default) or retried axis by
//! axis when the slide policy is configured.

use crate::config::{CollisionPolicy, RobotConfig};
use crate::error::{Error, Result};
use crate::geometry::{self, Point, Pose, Segment};
use crate::maze::Maze;
use crate::sensors::NoiseStream;
use serde::{Deserialize, Serialize};

/// One drive command, as carried on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DriveCommand {
    /// Linear (units/s) plus angular (rad/s) velocity
    Velocity { linear: f64, angular: f64 },

    /// Tank drive: left/right wheel surface speeds (units/s)
    Wheels { left: f64, right: f64 },

    /// Single-actuator adjustment; supported ids are "linear" and "angular"
    Actuator { id: String, value: f64 },
}

impl DriveCommand {
    /// The no-op command substituted on free-running ticks
    pub fn coast() -> Self {
        DriveCommand::Velocity {
            linear: 0.0,
            angular: 0.0,
        }
    }
}

/// Per-actuator systematic miscalibration, multiplicative on commanded
/// velocities. Randomized at most once, before the first tick.
#[derive(Debug, Clone, Copy)]
pub struct DriveBias {
    pub linear: f32,
    pub angular: f32,
}

impl DriveBias {
    /// Perfectly calibrated drive
    pub fn neutral() -> Self {
        Self {
            linear: 1.0,
            angular: 1.0,
        }
    }

    /// Draw both factors uniformly from [1-strength, 1+strength)
    pub fn randomized(strength: f32, noise: &mut NoiseStream) -> Self {
        Self {
            linear: 1.0 + noise.uniform_signed(strength),
            angular: 1.0 + noise.uniform_signed(strength),
        }
    }
}

/// Ground truth of one tick's motion, consumed by the sensor bank
#[derive(Debug, Clone, Copy)]
pub struct MotionSample {
    /// Pose after the tick settled
    pub pose: Pose,
    /// Signed arc length actually traveled (maze units)
    pub displacement: f32,
    /// Heading change actually applied (radians)
    pub turn: f32,
}

/// Result of applying one drive command
#[derive(Debug, Clone, Copy)]
pub struct DriveOutcome {
    /// False when the command was rejected by collision
    pub accepted: bool,
    pub sample: MotionSample,
}

/// The simulated robot: pose, body shape, and drive constraints
pub struct Robot {
    pose: Pose,
    body: Vec<Point>,
    perimeter: Vec<Point>,
    bias: DriveBias,
    max_linear_speed: f32,
    max_angular_speed: f32,
    wheel_base: f32,
    collision: CollisionPolicy,
}

impl Robot {
    pub fn new(config: &RobotConfig, bias: DriveBias) -> Self {
        let body: Vec<Point> = config
            .body
            .iter()
            .map(|v| Point::new(v[0], v[1]))
            .collect();
        let pose = Pose::new(config.start_x, config.start_y, config.start_heading);
        let perimeter = geometry::polygon_from_pose(&body, &pose);
        Self {
            pose,
            body,
            perimeter,
            bias,
            max_linear_speed: config.max_linear_speed,
            max_angular_speed: config.max_angular_speed,
            wheel_base: config.wheel_base,
            collision: config.collision,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Current occupied footprint in world coordinates
    pub fn perimeter(&self) -> &[Point] {
        &self.perimeter
    }

    /// Heading-facing reference point, at 0.75x the body's forward extent
    pub fn front_point(&self) -> Point {
        let forward_extent = self.body.iter().map(|p| p.x).fold(f32::MIN, f32::max);
        self.pose.transform(Point::new(0.75 * forward_extent, 0.0))
    }

    /// Resolve a command into (linear, angular) velocity.
    ///
    /// Unsupported actuator ids and non-finite values are command errors;
    /// the pose does not advance.
    fn resolve(&self, command: &DriveCommand) -> Result<(f32, f32)> {
        let (v, w) = match command {
            DriveCommand::Velocity { linear, angular } => (*linear as f32, *angular as f32),
            DriveCommand::Wheels { left, right } => {
                let l = *left as f32;
                let r = *right as f32;
                ((l + r) / 2.0, (r - l) / self.wheel_base)
            }
            DriveCommand::Actuator { id, value } => match id.as_str() {
                "linear" => (*value as f32, 0.0),
                "angular" => (0.0, *value as f32),
                other => {
                    return Err(Error::Command(format!("unknown actuator id '{}'", other)));
                }
            },
        };
        if !v.is_finite() || !w.is_finite() {
            return Err(Error::Command(format!(
                "non-finite velocity ({}, {})",
                v, w
            )));
        }
        Ok((v, w))
    }

    /// Apply one drive command over `dt` seconds.
    ///
    /// Velocities are scaled by the drive bias and clamped to the configured
    /// limits, which bounds per-tick displacement. On collision the pose is
    /// left untouched and the outcome reports `accepted = false`.
    pub fn apply(&mut self, command: &DriveCommand, dt: f32, maze: &Maze) -> Result<DriveOutcome> {
        let (v_cmd, w_cmd) = self.resolve(command)?;
        let v = (v_cmd * self.bias.linear).clamp(-self.max_linear_speed, self.max_linear_speed);
        let w = (w_cmd * self.bias.angular).clamp(-self.max_angular_speed, self.max_angular_speed);

        let candidate = integrate(&self.pose, v, w, dt);
        let perimeter = geometry::polygon_from_pose(&self.body, &candidate);

        if !motion_collides(&self.perimeter, &perimeter, maze) {
            self.pose = candidate;
            self.perimeter = perimeter;
            return Ok(DriveOutcome {
                accepted: true,
                sample: MotionSample {
                    pose: self.pose,
                    displacement: v * dt,
                    turn: w * dt,
                },
            });
        }

        if self.collision == CollisionPolicy::Slide {
            if let Some(outcome) = self.try_slide(&candidate, v, w, dt, maze) {
                return Ok(outcome);
            }
        }

        // Rejected: nothing moved this tick
        Ok(DriveOutcome {
            accepted: false,
            sample: MotionSample {
                pose: self.pose,
                displacement: 0.0,
                turn: 0.0,
            },
        })
    }

    /// Slide variant: retry the blocked translation one axis at a time,
    /// keeping the heading change. Both axes blocked still rejects.
    fn try_slide(
        &mut self,
        candidate: &Pose,
        v: f32,
        w: f32,
        dt: f32,
        maze: &Maze,
    ) -> Option<DriveOutcome> {
        let dx = candidate.x - self.pose.x;
        let dy = candidate.y - self.pose.y;

        for (try_dx, try_dy) in [(dx, 0.0), (0.0, dy)] {
            let slid = Pose::new(self.pose.x + try_dx, self.pose.y + try_dy, candidate.heading);
            let perimeter = geometry::polygon_from_pose(&self.body, &slid);
            if !motion_collides(&self.perimeter, &perimeter, maze) {
                let moved = (try_dx * try_dx + try_dy * try_dy).sqrt() * v.signum();
                self.pose = slid;
                self.perimeter = perimeter;
                return Some(DriveOutcome {
                    accepted: true,
                    sample: MotionSample {
                        pose: self.pose,
                        displacement: moved,
                        turn: w * dt,
                    },
                });
            }
        }
        None
    }
}

/// Exact differential-drive integration over one tick
fn integrate(pose: &Pose, linear_vel: f32, angular_vel: f32, dt: f32) -> Pose {
    if angular_vel.abs() < 1e-6 {
        // Straight-line motion
        Pose::new(
            pose.x + linear_vel * pose.heading.cos() * dt,
            pose.y + linear_vel * pose.heading.sin() * dt,
            pose.heading,
        )
    } else {
        // Arc motion
        let r = linear_vel / angular_vel;
        let new_heading = pose.heading + angular_vel * dt;
        Pose::new(
            pose.x + r * (new_heading.sin() - pose.heading.sin()),
            pose.y + r * (pose.heading.cos() - new_heading.cos()),
            new_heading,
        )
    }
}

/// True if the footprint touches any maze wall
fn collides(perimeter: &[Point], maze: &Maze) -> bool {
    maze.walls()
        .iter()
        .any(|wall| geometry::polygon_intersects_segment(perimeter, wall))
}

/// Collision test for one tick of motion: the candidate footprint must be
/// clear, and no body vertex may cross a wall on its way there. The vertex
/// sweep catches a fast tick stepping clean across a thin wall.
fn motion_collides(old: &[Point], new: &[Point], maze: &Maze) -> bool {
    if collides(new, maze) {
        return true;
    }
    old.iter().zip(new.iter()).any(|(a, b)| {
        let path = Segment::new(*a, *b);
        maze.walls()
            .iter()
            .any(|wall| geometry::segment_intersection(&path, wall).is_some())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MazeConfig;

    fn open_maze() -> Maze {
        // 120x120, robot spawns well clear of the boundary
        Maze::from_config(&MazeConfig {
            cells_x: 10,
            cells_y: 10,
            cell_size: 12.0,
            walls: Vec::new(),
            boundary: None,
            floor_rows: None,
        })
        .unwrap()
    }

    fn test_robot(x: f32, y: f32, heading: f32) -> Robot {
        let config = RobotConfig {
            body: vec![[1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]],
            start_x: x,
            start_y: y,
            start_heading: heading,
            max_linear_speed: 24.0,
            max_angular_speed: 3.0,
            wheel_base: 2.0,
            collision: CollisionPolicy::Reject,
        };
        Robot::new(&config, DriveBias::neutral())
    }

    #[test]
    fn test_straight_motion_in_open_space() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);

        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 1.0,
                    angular: 0.0,
                },
                1.0,
                &maze,
            )
            .unwrap();

        assert!(outcome.accepted);
        assert_eq!(robot.pose(), Pose::new(61.0, 60.0, 0.0));
        assert!((outcome.sample.displacement - 1.0).abs() < 1e-6);
        assert_eq!(outcome.sample.turn, 0.0);
    }

    #[test]
    fn test_rotation_in_place() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);

        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 0.0,
                    angular: 0.5,
                },
                1.0,
                &maze,
            )
            .unwrap();

        assert!(outcome.accepted);
        let pose = robot.pose();
        assert!((pose.x - 60.0).abs() < 1e-4);
        assert!((pose.y - 60.0).abs() < 1e-4);
        assert!((pose.heading - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_wheel_command_kinematics() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);

        // Equal wheel speeds drive straight
        let outcome = robot
            .apply(
                &DriveCommand::Wheels {
                    left: 2.0,
                    right: 2.0,
                },
                1.0,
                &maze,
            )
            .unwrap();
        assert!(outcome.accepted);
        assert!((robot.pose().x - 62.0).abs() < 1e-4);
        assert_eq!(outcome.sample.turn, 0.0);

        // Opposite wheel speeds rotate in place: w = (r - l) / wheel_base
        let outcome = robot
            .apply(
                &DriveCommand::Wheels {
                    left: -1.0,
                    right: 1.0,
                },
                1.0,
                &maze,
            )
            .unwrap();
        assert!(outcome.accepted);
        assert!((outcome.sample.turn - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_head_on_wall_rejected() {
        // Wall 5 units ahead of a robot with 1-unit body half-width
        let maze_config = MazeConfig {
            cells_x: 10,
            cells_y: 10,
            cell_size: 12.0,
            walls: vec![[65.0, 40.0, 65.0, 80.0]],
            boundary: None,
            floor_rows: None,
        };
        let maze = Maze::from_config(&maze_config).unwrap();
        let mut robot = test_robot(60.0, 60.0, 0.0);
        let before = robot.pose();

        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 10.0,
                    angular: 0.0,
                },
                1.0,
                &maze,
            )
            .unwrap();

        assert!(!outcome.accepted);
        // Bit-for-bit unchanged
        assert_eq!(robot.pose(), before);
        assert_eq!(outcome.sample.displacement, 0.0);
        assert_eq!(outcome.sample.turn, 0.0);

        // A short move that stays clear of the wall is still fine
        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 1.0,
                    angular: 0.0,
                },
                1.0,
                &maze,
            )
            .unwrap();
        assert!(outcome.accepted);
    }

    #[test]
    fn test_accepted_never_penetrates() {
        let maze = Maze::from_config(&MazeConfig {
            cells_x: 4,
            cells_y: 4,
            cell_size: 12.0,
            walls: vec![[24.0, 0.0, 24.0, 30.0]],
            boundary: None,
            floor_rows: None,
        })
        .unwrap();
        let mut robot = test_robot(10.0, 10.0, 0.0);

        // Hammer forward; every accepted tick must leave the footprint
        // clear of every wall
        for _ in 0..200 {
            let outcome = robot
                .apply(
                    &DriveCommand::Velocity {
                        linear: 4.0,
                        angular: 0.3,
                    },
                    0.1,
                    &maze,
                )
                .unwrap();
            let clear = !maze
                .walls()
                .iter()
                .any(|w| geometry::polygon_intersects_segment(robot.perimeter(), w));
            assert!(clear, "accepted={} pose={:?}", outcome.accepted, robot.pose());
        }
    }

    #[test]
    fn test_unknown_actuator_is_command_error() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);
        let before = robot.pose();

        let result = robot.apply(
            &DriveCommand::Actuator {
                id: "warp_core".to_string(),
                value: 1.0,
            },
            1.0,
            &maze,
        );

        assert!(matches!(result, Err(Error::Command(_))));
        assert_eq!(robot.pose(), before);
    }

    #[test]
    fn test_non_finite_velocity_is_command_error() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);

        let result = robot.apply(
            &DriveCommand::Velocity {
                linear: f64::NAN,
                angular: 0.0,
            },
            1.0,
            &maze,
        );
        assert!(matches!(result, Err(Error::Command(_))));
    }

    #[test]
    fn test_actuator_linear_drives_forward() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);

        let outcome = robot
            .apply(
                &DriveCommand::Actuator {
                    id: "linear".to_string(),
                    value: 2.0,
                },
                1.0,
                &maze,
            )
            .unwrap();
        assert!(outcome.accepted);
        assert!((robot.pose().x - 62.0).abs() < 1e-4);
    }

    #[test]
    fn test_speed_clamped_to_limits() {
        let maze = open_maze();
        let mut robot = test_robot(60.0, 60.0, 0.0);

        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 1000.0,
                    angular: 0.0,
                },
                0.1,
                &maze,
            )
            .unwrap();
        assert!(outcome.accepted);
        // Clamped to max_linear_speed = 24 -> 2.4 units in 0.1s
        assert!((outcome.sample.displacement - 2.4).abs() < 1e-4);
    }

    #[test]
    fn test_drive_bias_scales_motion() {
        let maze = open_maze();
        let config = RobotConfig {
            body: vec![[1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]],
            start_x: 60.0,
            start_y: 60.0,
            start_heading: 0.0,
            max_linear_speed: 24.0,
            max_angular_speed: 3.0,
            wheel_base: 2.0,
            collision: CollisionPolicy::Reject,
        };
        let mut robot = Robot::new(
            &config,
            DriveBias {
                linear: 1.1,
                angular: 1.0,
            },
        );

        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 2.0,
                    angular: 0.0,
                },
                1.0,
                &maze,
            )
            .unwrap();
        assert!((outcome.sample.displacement - 2.2).abs() < 1e-4);
    }

    #[test]
    fn test_slide_policy_moves_along_wall() {
        let maze = Maze::from_config(&MazeConfig {
            cells_x: 10,
            cells_y: 10,
            cell_size: 12.0,
            walls: vec![[65.0, 0.0, 65.0, 120.0]],
            boundary: None,
            floor_rows: None,
        })
        .unwrap();
        let config = RobotConfig {
            body: vec![[1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]],
            start_x: 60.0,
            start_y: 60.0,
            // Heading diagonally into the wall
            start_heading: std::f32::consts::FRAC_PI_4,
            max_linear_speed: 24.0,
            max_angular_speed: 3.0,
            wheel_base: 2.0,
            collision: CollisionPolicy::Slide,
        };
        let mut robot = Robot::new(&config, DriveBias::neutral());

        let outcome = robot
            .apply(
                &DriveCommand::Velocity {
                    linear: 8.0,
                    angular: 0.0,
                },
                1.0,
                &maze,
            )
            .unwrap();

        // X axis is blocked, Y axis slides
        assert!(outcome.accepted);
        assert!((robot.pose().x - 60.0).abs() < 1e-4);
        assert!(robot.pose().y > 60.0);
    }

    #[test]
    fn test_front_point_tracks_heading() {
        let robot = test_robot(60.0, 60.0, std::f32::consts::FRAC_PI_2);
        let front = robot.front_point();
        // Forward extent 1.0 -> reference point 0.75 ahead, rotated to +Y
        assert!((front.x - 60.0).abs() < 1e-4);
        assert!((front.y - 60.75).abs() < 1e-4);
    }
}
