//! Ambler core library.
//!
//! This crate runs one or more independent tabular Q-learning workers,
//! each owning an agent (actuators, sensors, Q-table) and a simulated
//! body, and coordinates their lifecycle. The binary (`src/main.rs`) is a
//! thin command-line harness around these components.
//!
//! # Architecture
//!
//! - **Index codec** (`codec`): pure mixed-radix mapping between
//!   multi-sensor/multi-actuator readings and the flat integer indices
//!   the Q-table is addressed by.
//!
//! - **Agent + learner** (`agent`, `qtable`, `learner`): one fixed rig,
//!   one exclusively-owned dense table, epsilon-greedy policy with a
//!   seeded ChaCha8 RNG and the standard tabular update.
//!
//! - **Simulator** (`simulator`): the external physics backend behind a
//!   trait; `RailSimulator` is the deterministic model body used until a
//!   real backend is wired in, and by the tests.
//!
//! - **Coordination core** (`signals`, `worker`, `manager`): the shared
//!   flag set every worker polls once per iteration, the worker loop
//!   state machine (Running -> Paused <-> Running -> Stopped), and the
//!   controller that starts, pauses, saves, and stops the worker set.
//!
//! - **Generation hand-off** (`evolution`): barrier +
//!   single-writer/multi-reader file exchange that propagates the fittest
//!   worker's table to the rest of the cohort.

pub mod agent;
pub mod codec;
pub mod config;
pub mod console;
pub mod evolution;
pub mod learner;
pub mod logging;
pub mod manager;
pub mod qtable;
pub mod signals;
pub mod simulator;
pub mod types;
pub mod worker;

// --- Re-exports for ergonomic external use ---------------------------------

pub use agent::{Actuator, Agent, AgentError, Sensor};
pub use codec::CodecError;
pub use config::{LearnerConfig, ManagerConfig, WorkerConfig};
pub use evolution::{EvolutionBarrier, EvolutionError, EvolutionHandoff};
pub use learner::{AgentLearner, EstimatorError};
pub use logging::{FileSink, NoopSink, StepRecord, TrainingSink};
pub use manager::{AgentManager, ManagerError};
pub use qtable::{QTable, QTableError};
pub use signals::{SaveState, SharedSignals};
pub use simulator::{RailSimulator, SimulationError, Simulator, SimulatorFactory};
pub use types::{ActionChoice, BodyShape, Response, ResponsePacket};
