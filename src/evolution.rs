// src/evolution.rs
//
// Generation hand-off: single-writer/multi-reader file exchange plus a
// full barrier.
//
// When one worker reaches the goal it is the generation's fittest; its
// table is persisted to a reserved location no per-worker save ever uses,
// every other worker adopts that table under a mutual-exclusion guard, and
// only then do all bodies reset and the next generation begin. The barrier
// lets exiting workers deregister, so a worker that hit its iteration
// budget can never strand the rest of the cohort.

use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::sync::watch;

use crate::qtable::{QTable, QTableError};

/// Hand-off failure.
#[derive(Debug)]
pub enum EvolutionError {
    /// The reserved location already holds an unconsumed generation's
    /// table. Overwriting it would silently corrupt an in-progress
    /// hand-off, so publishing fails loudly instead.
    AlreadyExists(PathBuf),
    Table(QTableError),
    Io(std::io::Error),
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolutionError::AlreadyExists(path) => write!(
                f,
                "reserved hand-off location {} already occupied",
                path.display()
            ),
            EvolutionError::Table(e) => write!(f, "hand-off table error: {}", e),
            EvolutionError::Io(e) => write!(f, "hand-off io error: {}", e),
        }
    }
}

impl std::error::Error for EvolutionError {}

impl From<QTableError> for EvolutionError {
    fn from(e: QTableError) -> Self {
        EvolutionError::Table(e)
    }
}

impl From<std::io::Error> for EvolutionError {
    fn from(e: std::io::Error) -> Self {
        EvolutionError::Io(e)
    }
}

/// Counted rendezvous with deregistration.
///
/// `wait()` releases everyone once the number of arrivals reaches the
/// expected participant count. A worker that exits instead of arriving
/// calls `deregister()`, which shrinks the expected count and releases
/// current waiters if they now satisfy it. The generation counter rides a
/// watch channel, so waiters subscribe before arriving and can never miss
/// the release.
#[derive(Debug)]
pub struct EvolutionBarrier {
    state: Mutex<BarrierState>,
    generation_tx: watch::Sender<u64>,
}

#[derive(Debug)]
struct BarrierState {
    expected: usize,
    arrived: usize,
    generation: u64,
}

impl EvolutionBarrier {
    pub fn new(expected: usize) -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            state: Mutex::new(BarrierState {
                expected,
                arrived: 0,
                generation: 0,
            }),
            generation_tx,
        }
    }

    /// Number of participants still registered.
    pub fn expected(&self) -> usize {
        self.state.lock().map(|s| s.expected).unwrap_or(0)
    }

    /// Arrive and wait for the rest of the cohort.
    pub async fn wait(&self) {
        let mut generation_rx = self.generation_tx.subscribe();
        let waiting_for = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            state.arrived += 1;
            if state.arrived >= state.expected {
                state.arrived = 0;
                state.generation += 1;
                let generation = state.generation;
                drop(state);
                let _ = self.generation_tx.send(generation);
                return;
            }
            state.generation
        };

        loop {
            if *generation_rx.borrow_and_update() > waiting_for {
                return;
            }
            if generation_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Leave the cohort permanently (worker exiting). Releases current
    /// waiters if the shrunken cohort is now fully arrived.
    pub fn deregister(&self) {
        let release = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(_) => return,
            };
            if state.expected > 0 {
                state.expected -= 1;
            }
            if state.expected > 0 && state.arrived >= state.expected {
                state.arrived = 0;
                state.generation += 1;
                Some(state.generation)
            } else if state.expected == 0 {
                state.arrived = 0;
                state.generation += 1;
                Some(state.generation)
            } else {
                None
            }
        };
        if let Some(generation) = release {
            let _ = self.generation_tx.send(generation);
        }
    }
}

/// The reserved hand-off location and its coordination primitives.
#[derive(Debug)]
pub struct EvolutionHandoff {
    path: PathBuf,
    guard: tokio::sync::Mutex<()>,
    barrier: EvolutionBarrier,
}

impl EvolutionHandoff {
    pub fn new(path: PathBuf, participants: usize) -> Self {
        Self {
            path,
            guard: tokio::sync::Mutex::new(()),
            barrier: EvolutionBarrier::new(participants),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn barrier(&self) -> &EvolutionBarrier {
        &self.barrier
    }

    /// Persist the fittest table to the reserved location. Fails with
    /// `AlreadyExists` if a prior generation's table was never consumed;
    /// creation is atomic (create_new), never an overwrite.
    pub async fn publish(&self, table: &QTable) -> Result<(), EvolutionError> {
        let _guard = self.guard.lock().await;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    EvolutionError::AlreadyExists(self.path.clone())
                } else {
                    EvolutionError::Io(e)
                }
            })?;
        serde_json::to_writer(BufWriter::new(file), table)
            .map_err(|e| EvolutionError::Table(QTableError::Serde(e)))?;
        Ok(())
    }

    /// Read the fittest table under the mutual-exclusion guard.
    pub async fn adopt(&self) -> Result<QTable, EvolutionError> {
        let _guard = self.guard.lock().await;
        Ok(QTable::load_from(&self.path)?)
    }

    /// Remove the reserved file once the generation completes, freeing the
    /// location for the next hand-off.
    pub async fn consume(&self) -> Result<(), EvolutionError> {
        let _guard = self.guard.lock().await;
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}
