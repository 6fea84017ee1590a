//! Wire message types for the control protocol
//!
//! The command direction carries an optional drive action plus an optional
//! sensor-query filter; the reply direction carries the tick index, the
//! acceptance flag, and the (possibly filtered) readings. Readings are
//! reported as `f64` with a defined unit per sensor kind: range sensors in
//! maze units, gyroscopes in accumulated radians, odometers in accumulated
//! maze units.

use crate::robot::DriveCommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Protocol version exchanged in the handshake
pub const PROTOCOL_VERSION: u32 = 1;

/// One command per tick: a drive action, a sensor query, or both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Drive action to apply this tick; absent means coast
    #[serde(default)]
    pub drive: Option<DriveCommand>,

    /// Sensor ids to report; absent means all sensors
    #[serde(default)]
    pub query: Option<Vec<String>>,
}

/// Frames sent by the algorithm client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Handshake, must be the first frame after connect
    Hello { version: u32 },

    /// Steady-state command, one per tick
    Request(CommandRequest),

    /// Orderly disconnect
    Bye,
}

/// One reply per consumed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReply {
    /// Authoritative tick index at which the command was applied
    pub tick: u64,

    /// False when the drive action was rejected by collision or was a
    /// command error
    pub accepted: bool,

    /// Command error description, if the drive action was malformed
    #[serde(default)]
    pub error: Option<String>,

    /// Sensor id to reading
    pub readings: BTreeMap<String, f64>,
}

/// Frames sent by the simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake acknowledgement
    Welcome { version: u32 },

    /// Per-tick reply
    Reply(TickReply),

    /// Session-fatal protocol failure, sent best-effort before closing
    Error { message: String },
}
