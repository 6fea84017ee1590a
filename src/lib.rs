//! Maya-Sim - educational maze robot simulator
//!
//! Simulates a differential drive robot inside a walled maze and exposes a
//! tick-synchronous TCP control protocol: an external algorithm client
//! submits one drive/query command per simulation tick and receives one
//! reply with the updated sensor readings. Sensor error injection (range
//! noise, gyro/odometer drift, drive bias) is driven by a single seeded
//! stream so whole sessions replay exactly.
//!
//! Core modules:
//! - [`geometry`]: pure planar geometry kernel (intersection, ray casting)
//! - [`maze`]: static walls and floor tile grid
//! - [`robot`]: differential drive kinematics and collision response
//! - [`sensors`]: range/gyro/odometer bank with configurable error models
//! - [`protocol`]: length-prefixed TCP command/response session
//! - [`sim`]: deterministic per-tick state machine
//! - [`scheduler`]: the fixed-tick main loop
//!
//! Rendering, window/input handling, and HUD drawing are external
//! collaborators: the scheduler publishes per-tick [`scheduler::RenderFrame`]
//! snapshots and consumes a stop flag plus optional override commands.

pub mod config;
pub mod error;
pub mod geometry;
pub mod maze;
pub mod protocol;
pub mod robot;
pub mod scheduler;
pub mod sensors;
pub mod sim;

pub use config::SimulatorConfig;
pub use error::{Error, Result};
