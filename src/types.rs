// src/types.rs
//
// Common shared types for the ambler learning harness.

use serde::{Deserialize, Serialize};

/// Identifier of an actuator, unique within one agent.
pub type ActuatorId = u32;

/// Identifier of a sensor, unique within one agent.
pub type SensorId = u32;

/// One actuator's chosen discrete value.
pub type ActionPacket = (ActuatorId, i32);

/// An agent-wide action: one chosen discrete value per actuator the agent
/// owns, each actuator named exactly once. Packet order does not matter for
/// encoding; the agent's actuator construction order does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionChoice {
    pub packets: Vec<ActionPacket>,
}

impl ActionChoice {
    pub fn new(packets: Vec<ActionPacket>) -> Self {
        Self { packets }
    }

    /// The chosen value for `actuator_id`, if the choice names it.
    pub fn value_for(&self, actuator_id: ActuatorId) -> Option<i32> {
        self.packets
            .iter()
            .find(|(id, _)| *id == actuator_id)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

/// One sensor's observed scalar reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponsePacket {
    pub sensor_id: SensorId,
    pub value: f64,
}

impl ResponsePacket {
    pub fn new(sensor_id: SensorId, value: f64) -> Self {
        Self { sensor_id, value }
    }
}

/// A full simulator response: one reading per sensor the agent owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub packets: Vec<ResponsePacket>,
}

impl Response {
    pub fn new(packets: Vec<ResponsePacket>) -> Self {
        Self { packets }
    }

    /// The reading for `sensor_id`, if present.
    pub fn value_for(&self, sensor_id: SensorId) -> Option<f64> {
        self.packets
            .iter()
            .find(|p| p.sensor_id == sensor_id)
            .map(|p| p.value)
    }
}

/// Opaque body descriptor forwarded to the simulation backend.
///
/// The harness never interprets this beyond handing it to the simulator
/// factory; the fields match what the reference rail simulator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyShape {
    /// Number of articulated segments in the simulated limb.
    pub segment_count: u32,
    /// Length of one segment in centimetres.
    pub segment_length_cm: f64,
}

impl Default for BodyShape {
    fn default() -> Self {
        Self {
            segment_count: 2,
            segment_length_cm: 10.0,
        }
    }
}
