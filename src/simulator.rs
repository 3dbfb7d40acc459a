// src/simulator.rs
//
// Simulation backend interface.
//
// The physics/graphics backend is an external collaborator: the harness
// only needs "execute this action, give me one reading per sensor" and
// "put the body back at its starting configuration". RailSimulator is the
// deterministic model body used until a real physics backend is wired in,
// and by every test that needs end-to-end worker behaviour.

use std::fmt;
use std::sync::Arc;

use crate::agent::{Actuator, Sensor};
use crate::types::{ActionChoice, ActuatorId, BodyShape, Response, ResponsePacket};

/// Transient simulation failure. Caught per iteration by the worker loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationError {
    pub message: String,
}

impl SimulationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulation error: {}", self.message)
    }
}

impl std::error::Error for SimulationError {}

/// One agent's simulated body.
pub trait Simulator: Send {
    /// Execute an action and report one reading per sensor.
    fn simulate(&mut self, action: &ActionChoice) -> Result<Response, SimulationError>;

    /// Return the body to its starting configuration (new generation).
    fn reset(&mut self) -> Result<(), SimulationError>;
}

/// Builds one simulator per worker. The controller never constructs
/// backends itself; callers inject whatever body they want simulated.
pub type SimulatorFactory =
    Arc<dyn Fn(usize, &BodyShape, bool) -> Box<dyn Simulator> + Send + Sync>;

/// Deterministic 1-D crawler body.
///
/// The first actuator is the drive joint, the last is the contact joint.
/// While the contact joint stays down (value > 0) across a step, swinging
/// the drive joint backwards drags the body forward along the rail;
/// swinging it forward pushes the body back. Sensor 0 reports the body's
/// position; each further sensor reports the matching actuator's angle.
pub struct RailSimulator {
    drive_id: ActuatorId,
    contact_id: ActuatorId,
    sensor_ids: Vec<u32>,
    actuator_ids: Vec<ActuatorId>,
    stroke_gain: f64,
    x_cm: f64,
    prev_drive: i32,
    prev_contact: i32,
    angles: Vec<i32>,
}

impl RailSimulator {
    pub fn new(actuators: &[Actuator], sensors: &[Sensor], shape: &BodyShape) -> Self {
        let drive = actuators.first();
        let contact = actuators.last();
        let initial_drive = drive.and_then(|a| a.actions().first().copied()).unwrap_or(0);
        let initial_contact = contact
            .and_then(|a| a.actions().first().copied())
            .unwrap_or(0);
        Self {
            drive_id: drive.map(|a| a.id()).unwrap_or(0),
            contact_id: contact.map(|a| a.id()).unwrap_or(0),
            sensor_ids: sensors.iter().map(|s| s.id()).collect(),
            actuator_ids: actuators.iter().map(|a| a.id()).collect(),
            stroke_gain: shape.segment_length_cm / 90.0,
            x_cm: 0.0,
            prev_drive: initial_drive,
            prev_contact: initial_contact,
            angles: actuators
                .iter()
                .map(|a| a.actions().first().copied().unwrap_or(0))
                .collect(),
        }
    }

    /// Current rail position in centimetres.
    pub fn position_cm(&self) -> f64 {
        self.x_cm
    }
}

impl Simulator for RailSimulator {
    fn simulate(&mut self, action: &ActionChoice) -> Result<Response, SimulationError> {
        let drive = action
            .value_for(self.drive_id)
            .ok_or_else(|| SimulationError::new("action names no drive joint value"))?;
        let contact = action
            .value_for(self.contact_id)
            .ok_or_else(|| SimulationError::new("action names no contact joint value"))?;

        // Dragging only moves the body while the contact joint stays down
        // for the whole stroke.
        if self.prev_contact > 0 && contact > 0 {
            self.x_cm += f64::from(self.prev_drive - drive) * self.stroke_gain;
        }
        self.x_cm = self.x_cm.max(0.0);

        self.prev_drive = drive;
        self.prev_contact = contact;
        for (angle, id) in self.angles.iter_mut().zip(self.actuator_ids.iter()) {
            if let Some(value) = action.value_for(*id) {
                *angle = value;
            }
        }

        let mut packets = Vec::with_capacity(self.sensor_ids.len());
        for (i, &sensor_id) in self.sensor_ids.iter().enumerate() {
            let value = if i == 0 {
                self.x_cm
            } else {
                self.angles
                    .get(i - 1)
                    .copied()
                    .map(f64::from)
                    .unwrap_or(0.0)
            };
            packets.push(ResponsePacket::new(sensor_id, value));
        }
        Ok(Response::new(packets))
    }

    fn reset(&mut self) -> Result<(), SimulationError> {
        self.x_cm = 0.0;
        // Joints hold their last commanded angles; only the position resets.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig() -> (Vec<Actuator>, Vec<Sensor>) {
        let actuators = vec![
            Actuator::new(0, vec![-45, 0, 45]), // drive
            Actuator::new(1, vec![-30, 30]),    // contact
        ];
        let sensors = vec![
            Sensor::new(0, 40, 0.0, 4000.0),
            Sensor::new(1, 3, -45.0, 45.0),
            Sensor::new(2, 2, -30.0, 30.0),
        ];
        (actuators, sensors)
    }

    fn choice(drive: i32, contact: i32) -> ActionChoice {
        ActionChoice::new(vec![(0, drive), (1, contact)])
    }

    #[test]
    fn drag_stroke_advances_the_body() {
        let (actuators, sensors) = rig();
        let mut sim = RailSimulator::new(&actuators, &sensors, &BodyShape::default());

        // Plant the contact joint, swing the drive joint forward, then
        // drag it back while still planted.
        sim.simulate(&choice(45, 30)).unwrap();
        let response = sim.simulate(&choice(-45, 30)).unwrap();

        // 90 degrees of stroke at 10cm segments => 10cm of travel.
        let x = response.value_for(0).unwrap();
        assert!((x - 10.0).abs() < 1e-9);
        assert_eq!(response.value_for(1).unwrap(), -45.0);
        assert_eq!(response.value_for(2).unwrap(), 30.0);
    }

    #[test]
    fn lifted_strokes_do_not_move_the_body() {
        let (actuators, sensors) = rig();
        let mut sim = RailSimulator::new(&actuators, &sensors, &BodyShape::default());

        sim.simulate(&choice(45, -30)).unwrap(); // lifted
        let response = sim.simulate(&choice(-45, -30)).unwrap();
        assert_eq!(response.value_for(0).unwrap(), 0.0);
    }

    #[test]
    fn position_never_goes_behind_the_start() {
        let (actuators, sensors) = rig();
        let mut sim = RailSimulator::new(&actuators, &sensors, &BodyShape::default());

        sim.simulate(&choice(-45, 30)).unwrap();
        let response = sim.simulate(&choice(45, 30)).unwrap(); // pushes back
        assert_eq!(response.value_for(0).unwrap(), 0.0);
    }

    #[test]
    fn reset_returns_to_starting_position() {
        let (actuators, sensors) = rig();
        let mut sim = RailSimulator::new(&actuators, &sensors, &BodyShape::default());

        sim.simulate(&choice(45, 30)).unwrap();
        sim.simulate(&choice(-45, 30)).unwrap();
        assert!(sim.position_cm() > 0.0);

        sim.reset().unwrap();
        assert_eq!(sim.position_cm(), 0.0);
    }

    #[test]
    fn missing_joint_value_is_an_error() {
        let (actuators, sensors) = rig();
        let mut sim = RailSimulator::new(&actuators, &sensors, &BodyShape::default());
        let partial = ActionChoice::new(vec![(0, 45)]);
        assert!(sim.simulate(&partial).is_err());
    }
}
