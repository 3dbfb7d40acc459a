// src/learner.rs
//
// Tabular Q-learning over one agent.
//
// The learner wraps an agent with an epsilon-greedy policy (deterministic
// given a seed, ChaCha8) and the standard tabular update. The reward is the
// per-iteration delta of the configured progress sensor, so crawling
// forward is rewarded and sliding back is penalized. Cross-agent mutation
// never happens here; tables move between agents only through the
// generation hand-off.

use std::fmt;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, AgentError};
use crate::config::LearnerConfig;
use crate::qtable::{QTable, QTableError};
use crate::types::{ActionChoice, Response, SensorId};

/// Transient estimator failure. Caught per iteration by the worker loop;
/// a single bad transition never terminates a worker.
#[derive(Debug)]
pub enum EstimatorError {
    Agent(AgentError),
    Table(QTableError),
    /// The response carries no reading for the configured progress sensor.
    MissingProgressSensor(SensorId),
}

impl fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorError::Agent(e) => write!(f, "estimator agent error: {}", e),
            EstimatorError::Table(e) => write!(f, "estimator table error: {}", e),
            EstimatorError::MissingProgressSensor(id) => {
                write!(f, "response has no reading for progress sensor {}", id)
            }
        }
    }
}

impl std::error::Error for EstimatorError {}

impl From<AgentError> for EstimatorError {
    fn from(e: AgentError) -> Self {
        EstimatorError::Agent(e)
    }
}

impl From<QTableError> for EstimatorError {
    fn from(e: QTableError) -> Self {
        EstimatorError::Table(e)
    }
}

/// One worker's learning state: agent, policy RNG, and episode bookkeeping.
#[derive(Debug)]
pub struct AgentLearner {
    agent: Agent,
    cfg: LearnerConfig,
    rng: ChaCha8Rng,
    state: usize,
    last_action: Option<usize>,
    progress: f64,
}

impl AgentLearner {
    /// Build a learner. If `qtable_path` points at an existing save, the
    /// table is loaded (shape-checked) so a session can resume a lineage.
    pub fn new(
        agent: Agent,
        cfg: LearnerConfig,
        qtable_path: Option<&Path>,
    ) -> Result<Self, EstimatorError> {
        let mut agent = agent;
        if let Some(path) = qtable_path {
            if path.exists() {
                let table = QTable::load_from(path)?;
                agent.replace_table(table)?;
            }
        }
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        Ok(Self {
            agent,
            cfg,
            rng,
            state: 0,
            last_action: None,
            progress: 0.0,
        })
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn table(&self) -> &QTable {
        self.agent.table()
    }

    /// Current encoded state index.
    pub fn state(&self) -> usize {
        self.state
    }

    /// Flat index of the most recently chosen action.
    pub fn last_action(&self) -> Option<usize> {
        self.last_action
    }

    /// Latest raw reading of the progress sensor.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Epsilon-greedy action for the current state.
    pub fn choose_action(&mut self) -> Result<ActionChoice, EstimatorError> {
        let action = if self.rng.gen::<f64>() < self.cfg.epsilon {
            self.rng.gen_range(0..self.agent.num_actions())
        } else {
            self.agent.table().best_action(self.state)
        };
        self.last_action = Some(action);
        Ok(self.agent.decode_action(action)?)
    }

    /// Feed back the simulator response: derive the next state and reward,
    /// apply the tabular update, advance the episode. Returns the reward.
    pub fn observe(&mut self, response: &Response) -> Result<f64, EstimatorError> {
        let next_state = self.agent.state_from_response(response)?;
        let progress = response
            .value_for(self.cfg.progress_sensor)
            .ok_or(EstimatorError::MissingProgressSensor(self.cfg.progress_sensor))?;
        let reward = progress - self.progress;

        if let Some(action) = self.last_action {
            let old = self.agent.table().get(self.state, action);
            let target = reward + self.cfg.gamma * self.agent.table().max_value(next_state);
            let updated = old + self.cfg.alpha * (target - old);
            self.agent.table_mut().set(self.state, action, updated);
        }

        self.state = next_state;
        self.progress = progress;
        Ok(reward)
    }

    /// Persist the table. Only the designated saver worker calls this.
    pub fn save(&self, path: &Path) -> Result<(), EstimatorError> {
        Ok(self.table().save_to(path)?)
    }

    /// Adopt the fittest generation's table. Shape-checked.
    pub fn adopt_table(&mut self, table: QTable) -> Result<(), EstimatorError> {
        Ok(self.agent.replace_table(table)?)
    }

    /// Reset episode bookkeeping after the simulated body returns to its
    /// starting configuration. The table is kept; only position state and
    /// the pending transition are dropped.
    pub fn reset_episode(&mut self) {
        self.state = 0;
        self.last_action = None;
        self.progress = 0.0;
    }
}
