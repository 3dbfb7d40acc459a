// src/manager.rs
//
// Lifecycle controller for the learning workers.
//
// The manager owns the set of running worker tasks and the one shared
// coordination-state instance they all poll. Its operations only ever
// signal workers; it never touches an individual worker's Q-table. All
// operations are safe to call while workers are mid-loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::agent::{Actuator, Agent, AgentError, Sensor};
use crate::config::ManagerConfig;
use crate::evolution::EvolutionHandoff;
use crate::learner::{AgentLearner, EstimatorError};
use crate::logging::{FileSink, NoopSink, TrainingSink};
use crate::signals::{SaveState, SharedSignals};
use crate::simulator::SimulatorFactory;
use crate::types::BodyShape;
use crate::worker::{agent_task, WorkerSpec};

/// Controller-level failure, surfaced to the caller of the API and never
/// silently swallowed.
#[derive(Debug)]
pub enum ManagerError {
    /// An operation that needs live workers was called with none spawned.
    NoWorkers,
    /// The designated saver exited before the requested save completed.
    /// Raised instead of waiting forever on a flag nobody will clear.
    SaveLiveness,
    /// The designated saver attempted the write and it failed.
    SaveFailed,
    /// The saver is alive but did not service the request within the
    /// configured wait (for example, it is parked at the generation
    /// barrier while its peers are paused).
    SaveTimeout,
    /// start() was called while a previous session is still live.
    AlreadyRunning,
    Agent(AgentError),
    Estimator(EstimatorError),
    Io(std::io::Error),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::NoWorkers => write!(f, "there are no agent workers"),
            ManagerError::SaveLiveness => {
                write!(f, "designated saver worker exited before saving")
            }
            ManagerError::SaveFailed => {
                write!(f, "designated saver failed to write the qtable")
            }
            ManagerError::SaveTimeout => {
                write!(f, "save was not serviced within the configured wait")
            }
            ManagerError::AlreadyRunning => {
                write!(f, "workers are already running; stop() first")
            }
            ManagerError::Agent(e) => write!(f, "worker construction failed: {}", e),
            ManagerError::Estimator(e) => write!(f, "learner construction failed: {}", e),
            ManagerError::Io(e) => write!(f, "manager io error: {}", e),
        }
    }
}

impl std::error::Error for ManagerError {}

impl From<AgentError> for ManagerError {
    fn from(e: AgentError) -> Self {
        ManagerError::Agent(e)
    }
}

impl From<EstimatorError> for ManagerError {
    fn from(e: EstimatorError) -> Self {
        ManagerError::Estimator(e)
    }
}

struct WorkerHandle {
    index: usize,
    can_save: bool,
    handle: JoinHandle<()>,
}

/// Spawns, pauses, resumes, saves, and stops the agent workers.
pub struct AgentManager {
    cfg: ManagerConfig,
    actuators: Vec<Actuator>,
    sensors: Vec<Sensor>,
    body: BodyShape,
    sim_factory: SimulatorFactory,
    signals: Arc<SharedSignals>,
    workers: Vec<WorkerHandle>,
}

impl AgentManager {
    pub fn new(
        cfg: ManagerConfig,
        actuators: Vec<Actuator>,
        sensors: Vec<Sensor>,
        body: BodyShape,
        sim_factory: SimulatorFactory,
    ) -> Self {
        Self {
            cfg,
            actuators,
            sensors,
            body,
            sim_factory,
            signals: Arc::new(SharedSignals::new()),
            workers: Vec::new(),
        }
    }

    /// Spawn `count` independent workers, each with its own agent and
    /// simulated body, all sharing one fresh coordination-state instance.
    ///
    /// The first worker by construction order is the only one permitted to
    /// save its Q-table; that designation is fixed for the session. A
    /// single-worker session cannot teach anyone, so the evolution goal is
    /// forced off for `count == 1`.
    pub fn start(&mut self, count: usize) -> Result<(), ManagerError> {
        if !self.workers.is_empty() {
            return Err(ManagerError::AlreadyRunning);
        }
        if count == 0 {
            return Err(ManagerError::NoWorkers);
        }

        // Fresh signals per session; a previous session's end request must
        // not leak into this one.
        self.signals = Arc::new(SharedSignals::new());
        self.signals.set_use_evolution_goal(count > 1);

        let handoff = Arc::new(EvolutionHandoff::new(self.cfg.handoff_path.clone(), count));

        for index in 0..count {
            let agent = Agent::new(self.actuators.clone(), self.sensors.clone())?;
            let mut learner_cfg = self.cfg.learner.clone();
            learner_cfg.seed = learner_cfg.seed.wrapping_add(index as u64);
            let learner = AgentLearner::new(agent, learner_cfg, Some(&self.cfg.qtable_path))?;

            let simulator =
                (self.sim_factory)(index, &self.body, self.cfg.worker.draw_graphics);
            let sink = self.make_sink(index)?;

            let spec = WorkerSpec {
                index,
                can_save: index == 0,
                qtable_path: self.cfg.qtable_path.clone(),
                max_iterations: self.cfg.worker.max_iterations,
                pause_poll: Duration::from_millis(self.cfg.worker.pause_poll_ms),
                goal_threshold: self.cfg.worker.goal_threshold,
            };
            let can_save = spec.can_save;
            let handle = tokio::spawn(agent_task(
                spec,
                learner,
                simulator,
                self.signals.clone(),
                handoff.clone(),
                sink,
            ));
            self.workers.push(WorkerHandle {
                index,
                can_save,
                handle,
            });
        }
        Ok(())
    }

    fn make_sink(&self, index: usize) -> Result<Box<dyn TrainingSink>, ManagerError> {
        match &self.cfg.log_dir {
            Some(dir) => {
                let path = dir.join(format!("worker-{}.jsonl", index));
                let sink = FileSink::create(&path).map_err(ManagerError::Io)?;
                Ok(Box::new(sink))
            }
            None => Ok(Box::new(NoopSink)),
        }
    }

    /// Request a pause. Returns immediately; workers observe the flag at
    /// their next iteration boundary.
    pub fn pause(&self) {
        self.signals.request_pause();
    }

    /// Resume regular execution from a paused state.
    pub fn resume(&self) {
        self.signals.clear_pause();
    }

    /// Save the designated worker's Q-table.
    ///
    /// Pauses all workers first so the snapshot is taken at a consistent
    /// point, then waits for the saver to report the outcome. Pause stays
    /// in effect after the save; the caller resumes explicitly. The wait
    /// is bounded three ways: a saver that already exited (for example,
    /// it hit its iteration budget) fails with `SaveLiveness`; a saver
    /// whose write failed surfaces as `SaveFailed` rather than a phantom
    /// success; a saver that is alive but unable to park (stuck in its
    /// simulator or at the generation barrier) fails with `SaveTimeout`
    /// after `save_timeout_ms` instead of wedging the caller.
    pub async fn save(&self) -> Result<(), ManagerError> {
        if self.workers.is_empty() {
            return Err(ManagerError::NoWorkers);
        }
        let saver = self
            .workers
            .iter()
            .find(|w| w.can_save)
            .ok_or(ManagerError::NoWorkers)?;

        self.signals.request_pause();
        self.signals.request_save();

        let poll = Duration::from_millis(self.cfg.save_poll_ms.max(1));
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.cfg.save_timeout_ms.max(1));
        loop {
            match self.signals.save_state() {
                SaveState::Done => {
                    self.signals.acknowledge_save();
                    return Ok(());
                }
                SaveState::Failed => {
                    self.signals.acknowledge_save();
                    return Err(ManagerError::SaveFailed);
                }
                SaveState::Requested | SaveState::Idle => {}
            }
            if saver.handle.is_finished() {
                // Nobody is left to service the request; withdraw it so
                // it cannot poison a later session.
                self.signals.acknowledge_save();
                return Err(ManagerError::SaveLiveness);
            }
            if tokio::time::Instant::now() >= deadline {
                self.signals.acknowledge_save();
                return Err(ManagerError::SaveTimeout);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Cleanly end every worker and wait for all of them to reach their
    /// terminal state. Idempotent: calling it again, or with no workers,
    /// does nothing. After it returns the manager holds no live workers.
    pub async fn stop(&mut self) {
        self.signals.clear_pause();
        self.signals.request_end();
        for worker in self.workers.drain(..) {
            if let Err(err) = worker.handle.await {
                eprintln!("worker {}: join failed: {}", worker.index, err);
            }
        }
    }

    /// Number of workers spawned this session (live or finished).
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers whose tasks have not yet reached Stopped.
    pub fn live_workers(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| !w.handle.is_finished())
            .count()
    }

    /// The session's shared coordination state.
    pub fn signals(&self) -> &Arc<SharedSignals> {
        &self.signals
    }
}
