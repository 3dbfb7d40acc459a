// src/agent.rs
//
// Actuators, sensors, and the agent that owns them.
//
// An agent is a fixed rig of actuators and sensors plus one Q-table sized
// `num_states x num_actions`, where both totals are the product of the
// per-device quantization step counts. E.g. actuators with 3, 2 and 2
// possible actions give 12 actions per state; three sensors with 10 bins
// each give 1000 states, so the table is 1000 x 12. The "ID" of a state or
// action is its flat index as produced by the codec.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};
use crate::qtable::{QTable, QTableError};
use crate::types::{ActionChoice, ActuatorId, Response, SensorId};

/// One controllable joint: an ordered list of the discrete values it can
/// take. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actuator {
    id: ActuatorId,
    actions: Vec<i32>,
}

impl Actuator {
    pub fn new(id: ActuatorId, actions: Vec<i32>) -> Self {
        Self { id, actions }
    }

    pub fn id(&self) -> ActuatorId {
        self.id
    }

    /// Ordered action values; the positional index within this list is the
    /// actuator's digit in the flat action index.
    pub fn actions(&self) -> &[i32] {
        &self.actions
    }

    pub fn quantization_steps(&self) -> usize {
        self.actions.len()
    }
}

/// One state-detecting sensor: a physical range discretized into
/// `quantization_steps` bins. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    id: SensorId,
    quantization_steps: usize,
    min_value: f64,
    max_value: f64,
}

impl Sensor {
    pub fn new(id: SensorId, quantization_steps: usize, min_value: f64, max_value: f64) -> Self {
        Self {
            id,
            quantization_steps,
            min_value,
            max_value,
        }
    }

    pub fn id(&self) -> SensorId {
        self.id
    }

    pub fn quantization_steps(&self) -> usize {
        self.quantization_steps
    }

    /// Discretize a raw reading into a bin in `[0, quantization_steps)`.
    /// Readings outside the physical range clamp to the edge bins.
    pub fn bin(&self, reading: f64) -> usize {
        if self.quantization_steps <= 1 || self.max_value <= self.min_value {
            return 0;
        }
        let span = self.max_value - self.min_value;
        let fraction = (reading - self.min_value) / span;
        let bin = (fraction * self.quantization_steps as f64).floor();
        (bin.max(0.0) as usize).min(self.quantization_steps - 1)
    }
}

/// Rejected agent construction or a response that cannot be encoded.
#[derive(Debug)]
pub enum AgentError {
    Codec(CodecError),
    Table(QTableError),
    DuplicateActuatorId(ActuatorId),
    DuplicateSensorId(SensorId),
    /// The simulator response carries no reading for an owned sensor.
    MissingSensorReading(SensorId),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Codec(e) => write!(f, "agent codec error: {}", e),
            AgentError::Table(e) => write!(f, "agent table error: {}", e),
            AgentError::DuplicateActuatorId(id) => {
                write!(f, "duplicate actuator id {}", id)
            }
            AgentError::DuplicateSensorId(id) => write!(f, "duplicate sensor id {}", id),
            AgentError::MissingSensorReading(id) => {
                write!(f, "response has no reading for sensor {}", id)
            }
        }
    }
}

impl std::error::Error for AgentError {}

impl From<CodecError> for AgentError {
    fn from(e: CodecError) -> Self {
        AgentError::Codec(e)
    }
}

impl From<QTableError> for AgentError {
    fn from(e: QTableError) -> Self {
        AgentError::Table(e)
    }
}

/// A fixed actuator/sensor rig plus its exclusively-owned Q-table.
#[derive(Debug, Clone)]
pub struct Agent {
    actuators: Vec<Actuator>,
    sensors: Vec<Sensor>,
    sensor_steps: Vec<usize>,
    num_states: usize,
    num_actions: usize,
    table: QTable,
}

impl Agent {
    /// Build an agent from its rig. Rejects duplicate device IDs,
    /// zero-device rigs, zero step counts, and state/action spaces that
    /// overflow the index type.
    pub fn new(actuators: Vec<Actuator>, sensors: Vec<Sensor>) -> Result<Self, AgentError> {
        for (i, a) in actuators.iter().enumerate() {
            if actuators[..i].iter().any(|prev| prev.id() == a.id()) {
                return Err(AgentError::DuplicateActuatorId(a.id()));
            }
        }
        for (i, s) in sensors.iter().enumerate() {
            if sensors[..i].iter().any(|prev| prev.id() == s.id()) {
                return Err(AgentError::DuplicateSensorId(s.id()));
            }
        }

        let sensor_steps: Vec<usize> = sensors.iter().map(|s| s.quantization_steps()).collect();
        let actuator_steps: Vec<usize> =
            actuators.iter().map(|a| a.quantization_steps()).collect();
        let num_states = codec::capacity(&sensor_steps)?;
        let num_actions = codec::capacity(&actuator_steps)?;
        // Guard the full table allocation as well, not just each axis.
        num_states
            .checked_mul(num_actions)
            .ok_or(AgentError::Codec(CodecError::CapacityOverflow))?;

        let table = QTable::zeroed(num_states, num_actions);
        Ok(Self {
            actuators,
            sensors,
            sensor_steps,
            num_states,
            num_actions,
            table,
        })
    }

    pub fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut QTable {
        &mut self.table
    }

    /// Adopt a table from the generation hand-off. Shape must match.
    pub fn replace_table(&mut self, table: QTable) -> Result<(), AgentError> {
        if table.shape() != (self.num_states, self.num_actions) {
            return Err(AgentError::Table(QTableError::Shape {
                expected: (self.num_states, self.num_actions),
                found: table.shape(),
            }));
        }
        self.table = table;
        Ok(())
    }

    /// Discretize a simulator response into the flat state index. Every
    /// owned sensor must have a reading.
    pub fn state_from_response(&self, response: &Response) -> Result<usize, AgentError> {
        let mut bins = Vec::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            let reading = response
                .value_for(sensor.id())
                .ok_or(AgentError::MissingSensorReading(sensor.id()))?;
            bins.push(sensor.bin(reading));
        }
        Ok(codec::encode_state(&bins, &self.sensor_steps)?)
    }

    /// Flat action index for a choice over this agent's actuators.
    pub fn encode_action(&self, choice: &ActionChoice) -> Result<usize, AgentError> {
        Ok(codec::encode_action(choice, &self.actuators)?)
    }

    /// Materialize a flat action index as a per-actuator choice.
    pub fn decode_action(&self, index: usize) -> Result<ActionChoice, AgentError> {
        Ok(codec::decode_action(index, &self.actuators)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponsePacket;

    fn rig() -> (Vec<Actuator>, Vec<Sensor>) {
        let actuators = vec![
            Actuator::new(0, vec![-45, 0, 45]),
            Actuator::new(1, vec![-30, 30]),
        ];
        let sensors = vec![
            Sensor::new(0, 10, 0.0, 100.0),
            Sensor::new(1, 3, -45.0, 45.0),
        ];
        (actuators, sensors)
    }

    #[test]
    fn derives_exact_space_sizes() {
        let (actuators, sensors) = rig();
        let agent = Agent::new(actuators, sensors).unwrap();
        assert_eq!(agent.num_states(), 30);
        assert_eq!(agent.num_actions(), 6);
        assert_eq!(agent.table().shape(), (30, 6));
    }

    #[test]
    fn rejects_zero_device_rigs() {
        let (actuators, sensors) = rig();
        assert!(Agent::new(vec![], sensors.clone()).is_err());
        assert!(Agent::new(actuators, vec![]).is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let actuators = vec![Actuator::new(3, vec![0, 1]), Actuator::new(3, vec![2, 4])];
        let sensors = vec![Sensor::new(0, 4, 0.0, 1.0)];
        match Agent::new(actuators, sensors) {
            Err(AgentError::DuplicateActuatorId(3)) => {}
            other => panic!("expected duplicate actuator error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_overflowing_spaces() {
        let sensors: Vec<Sensor> = (0..9)
            .map(|i| Sensor::new(i, usize::MAX, 0.0, 1.0))
            .collect();
        let actuators = vec![Actuator::new(0, vec![0, 1])];
        assert!(Agent::new(actuators, sensors).is_err());
    }

    #[test]
    fn sensor_bins_clamp_to_range() {
        let sensor = Sensor::new(0, 10, 0.0, 100.0);
        assert_eq!(sensor.bin(-5.0), 0);
        assert_eq!(sensor.bin(0.0), 0);
        assert_eq!(sensor.bin(55.0), 5);
        assert_eq!(sensor.bin(99.9), 9);
        assert_eq!(sensor.bin(250.0), 9);
    }

    #[test]
    fn state_from_response_requires_every_sensor() {
        let (actuators, sensors) = rig();
        let agent = Agent::new(actuators, sensors).unwrap();

        let full = Response::new(vec![
            ResponsePacket::new(0, 55.0),
            ResponsePacket::new(1, 0.0),
        ]);
        // bin(55.0) = 5 for sensor 0 (radix 10), bin(0.0) = 1 for sensor 1
        assert_eq!(agent.state_from_response(&full).unwrap(), 5 + 10 * 1);

        let partial = Response::new(vec![ResponsePacket::new(0, 55.0)]);
        match agent.state_from_response(&partial) {
            Err(AgentError::MissingSensorReading(1)) => {}
            other => panic!("expected missing sensor error, got {:?}", other),
        }
    }

    #[test]
    fn replace_table_is_shape_checked() {
        let (actuators, sensors) = rig();
        let mut agent = Agent::new(actuators, sensors).unwrap();
        assert!(agent.replace_table(QTable::zeroed(30, 6)).is_ok());
        assert!(agent.replace_table(QTable::zeroed(30, 5)).is_err());
    }
}
