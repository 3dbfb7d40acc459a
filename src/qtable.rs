// src/qtable.rs
//
// Dense estimator table.
//
// A Q-table is a row-major `num_states x num_actions` grid of estimated
// returns, indexed only by the flat integers the codec produces. Each agent
// owns exactly one table; tables never move between agents except through
// the explicit generation hand-off.
//
// Persistence is an opaque serde_json blob keyed by a filename. The byte
// layout is not a contract; shape compatibility is.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Persistence / shape failure for a Q-table.
#[derive(Debug)]
pub enum QTableError {
    Io(std::io::Error),
    Serde(serde_json::Error),
    /// Loaded or adopted table does not match the agent's state/action space.
    Shape {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Stored value vector is inconsistent with its own header.
    Corrupt {
        expected_len: usize,
        found_len: usize,
    },
}

impl fmt::Display for QTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QTableError::Io(e) => write!(f, "qtable io error: {}", e),
            QTableError::Serde(e) => write!(f, "qtable encoding error: {}", e),
            QTableError::Shape { expected, found } => write!(
                f,
                "qtable shape mismatch: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            QTableError::Corrupt {
                expected_len,
                found_len,
            } => write!(
                f,
                "qtable corrupt: header says {} values, found {}",
                expected_len, found_len
            ),
        }
    }
}

impl std::error::Error for QTableError {}

impl From<std::io::Error> for QTableError {
    fn from(e: std::io::Error) -> Self {
        QTableError::Io(e)
    }
}

impl From<serde_json::Error> for QTableError {
    fn from(e: serde_json::Error) -> Self {
        QTableError::Serde(e)
    }
}

/// Dense table of estimated returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    num_states: usize,
    num_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    /// A zero-initialized table of the given shape.
    pub fn zeroed(num_states: usize, num_actions: usize) -> Self {
        Self {
            num_states,
            num_actions,
            values: vec![0.0; num_states * num_actions],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_states, self.num_actions)
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.num_actions + action]
    }

    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        self.values[state * self.num_actions + action] = value;
    }

    /// Row of estimated returns for one state.
    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * self.num_actions;
        &self.values[start..start + self.num_actions]
    }

    /// Greedy action for `state`. Ties resolve to the lowest index so the
    /// policy is deterministic given a seed.
    pub fn best_action(&self, state: usize) -> usize {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (action, &value) in self.row(state).iter().enumerate() {
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    /// Largest estimated return for `state`.
    pub fn max_value(&self, state: usize) -> f64 {
        self.row(state).iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Write the table to `path`, overwriting any previous save.
    pub fn save_to(&self, path: &Path) -> Result<(), QTableError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Read a table from `path`, validating internal consistency.
    pub fn load_from(path: &Path) -> Result<Self, QTableError> {
        let file = File::open(path)?;
        let table: QTable = serde_json::from_reader(BufReader::new(file))?;
        let expected_len = table.num_states * table.num_actions;
        if table.values.len() != expected_len {
            return Err(QTableError::Corrupt {
                expected_len,
                found_len: table.values.len(),
            });
        }
        Ok(table)
    }
}
