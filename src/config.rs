// src/config.rs
//
// Central configuration for the ambler harness.
//
// Everything here is plain data with sensible defaults; the CLI and tests
// override individual fields. Learning-rate / discount schedules are not
// tuned here, only carried.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::SensorId;

/// Reserved filename for the fittest generation's table during evolution.
/// Distinct from any per-worker save path; guarded by the hand-off mutex.
pub const DEFAULT_HANDOFF_FILENAME: &str = "generations_fittest_qtable.json";

/// Tabular update and policy parameters for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Learning rate.
    pub alpha: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Exploration probability for the epsilon-greedy policy.
    pub epsilon: f64,
    /// RNG seed; workers offset this by their index so runs are
    /// deterministic but not identical across workers.
    pub seed: u64,
    /// Sensor whose raw reading is the worker's progress metric. The
    /// reward is the per-iteration delta of this reading; the fitness
    /// criterion compares it against the configured goal threshold.
    pub progress_sensor: SensorId,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.2,
            seed: 42,
            progress_sensor: 0,
        }
    }
}

/// Per-worker loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Iteration budget; 0 runs forever.
    pub max_iterations: u64,
    /// Bounded polling interval while paused, in milliseconds.
    pub pause_poll_ms: u64,
    /// Progress-metric threshold that marks a worker as the generation's
    /// fittest. Injected policy, not hard-coded.
    pub goal_threshold: f64,
    /// Forwarded to the simulator factory; the harness itself renders
    /// nothing.
    pub draw_graphics: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 0,
            pause_poll_ms: 500,
            goal_threshold: 3000.0,
            draw_graphics: false,
        }
    }
}

/// Session-wide controller parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Per-session Q-table save path (designated saver only).
    pub qtable_path: PathBuf,
    /// Reserved evolution hand-off location.
    pub handoff_path: PathBuf,
    /// Polling interval while waiting for a save to complete, in
    /// milliseconds.
    pub save_poll_ms: u64,
    /// Upper bound on the whole save wait, in milliseconds. A saver that
    /// cannot park (stuck mid-simulation or at the generation barrier)
    /// turns into an error at this point instead of wedging the caller.
    pub save_timeout_ms: u64,
    /// Optional directory for per-worker JSONL step logs.
    pub log_dir: Option<PathBuf>,
    pub worker: WorkerConfig,
    pub learner: LearnerConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            qtable_path: PathBuf::from("qtable.json"),
            handoff_path: PathBuf::from(DEFAULT_HANDOFF_FILENAME),
            save_poll_ms: 100,
            save_timeout_ms: 10_000,
            log_dir: None,
            worker: WorkerConfig::default(),
            learner: LearnerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ManagerConfig::default();
        assert!(cfg.learner.alpha > 0.0 && cfg.learner.alpha <= 1.0);
        assert!(cfg.learner.gamma > 0.0 && cfg.learner.gamma <= 1.0);
        assert!(cfg.learner.epsilon >= 0.0 && cfg.learner.epsilon <= 1.0);
        assert_eq!(cfg.worker.max_iterations, 0); // unbounded by default
        assert!(cfg.save_timeout_ms > cfg.save_poll_ms);
        assert!(cfg.save_timeout_ms > cfg.worker.pause_poll_ms);
        assert_ne!(cfg.qtable_path, cfg.handoff_path);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ManagerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ManagerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.worker.pause_poll_ms, cfg.worker.pause_poll_ms);
        assert_eq!(back.learner.seed, cfg.learner.seed);
    }
}
