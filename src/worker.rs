// src/worker.rs
//
// The learning worker loop: one long-lived task per agent, where the
// learning and the simulation of that agent communicate.
//
// State machine per worker: Running -> (Paused <-> Running) -> Stopped,
// Stopped terminal. Workers poll the shared signals once per full
// iteration, never mid-simulator-call, so cancellation latency is bounded
// by one simulator round-trip.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::evolution::{EvolutionError, EvolutionHandoff};
use crate::learner::{AgentLearner, EstimatorError};
use crate::logging::{StepRecord, TrainingSink};
use crate::signals::SharedSignals;
use crate::simulator::{SimulationError, Simulator};

/// Spawn-time parameters for one worker.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// Position in construction order; worker 0 is the designated saver.
    pub index: usize,
    /// Whether this worker may perform the session save. Fixed at spawn.
    pub can_save: bool,
    /// Where the designated saver persists the table.
    pub qtable_path: PathBuf,
    /// Iteration budget; 0 runs forever.
    pub max_iterations: u64,
    /// Bounded polling interval while paused.
    pub pause_poll: Duration,
    /// Progress threshold marking this generation's fittest worker.
    pub goal_threshold: f64,
}

/// Per-iteration failure, recovered locally by skipping the iteration.
#[derive(Debug)]
pub enum StepError {
    Simulation(SimulationError),
    Estimator(EstimatorError),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Simulation(e) => write!(f, "{}", e),
            StepError::Estimator(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StepError {}

/// One learning/simulation exchange: choose, simulate, feed back.
fn step(
    learner: &mut AgentLearner,
    simulator: &mut dyn Simulator,
) -> Result<StepRecord, StepError> {
    let choice = learner.choose_action().map_err(StepError::Estimator)?;
    let response = simulator.simulate(&choice).map_err(StepError::Simulation)?;
    let reward = learner.observe(&response).map_err(StepError::Estimator)?;
    Ok(StepRecord {
        state: learner.state(),
        action: learner.last_action().unwrap_or(0),
        reward,
        progress: learner.progress(),
    })
}

/// Task body for one agent's learning and simulation.
///
/// `max_iterations == 0` makes the task run forever; otherwise it bounds
/// the run (used by tests). Only the worker spawned with `can_save` may
/// persist its table during a pause.
pub(crate) async fn agent_task(
    spec: WorkerSpec,
    mut learner: AgentLearner,
    mut simulator: Box<dyn Simulator>,
    signals: Arc<SharedSignals>,
    handoff: Arc<EvolutionHandoff>,
    mut sink: Box<dyn TrainingSink>,
) {
    let mut count: u64 = 0;
    loop {
        // The learning and simulation parts communicate; a single bad
        // transition is logged and skipped, never fatal.
        match step(&mut learner, simulator.as_mut()) {
            Ok(record) => sink.log_step(spec.index, count, &record),
            Err(err) => {
                eprintln!("worker {}: iteration {} skipped: {}", spec.index, count, err);
            }
        }

        // If an agent has reached the goal it is the fittest of this
        // generation and teaches the others by having them copy its
        // Q-table through the reserved hand-off location.
        if signals.use_evolution_goal() {
            let is_winner = !signals.goal_reached()
                && learner.progress() >= spec.goal_threshold
                && signals.claim_goal();
            if signals.goal_reached() {
                run_generation_handoff(
                    is_winner,
                    &spec,
                    &mut learner,
                    simulator.as_mut(),
                    &signals,
                    &handoff,
                )
                .await;
            }
        }

        count += 1;
        if spec.max_iterations != 0 && count >= spec.max_iterations {
            break;
        }

        // Listen to requests from the controller: pause self, save the
        // table while paused, resume, end.
        while signals.pause_requested() {
            tokio::time::sleep(spec.pause_poll).await;
            if spec.can_save && signals.save_requested() {
                // The outcome, success or failure, travels back to the
                // controller; a failed write must never read as saved.
                match learner.save(&spec.qtable_path) {
                    Ok(()) => signals.record_save_outcome(true),
                    Err(err) => {
                        eprintln!("worker {}: qtable save failed: {}", spec.index, err);
                        signals.record_save_outcome(false);
                    }
                }
            }
        }
        if signals.end_requested() {
            break;
        }

        // The loop has no other await point while running; yield so the
        // controller and sibling workers stay scheduled.
        tokio::task::yield_now().await;
    }

    // Terminal: leave the hand-off cohort so no peer waits on this worker.
    handoff.barrier().deregister();
}

/// One generation's hand-off, executed by every worker once the goal flag
/// is up. Full barrier: nobody starts generation N+1 before every worker
/// finishes copying generation N.
async fn run_generation_handoff(
    is_winner: bool,
    spec: &WorkerSpec,
    learner: &mut AgentLearner,
    simulator: &mut dyn Simulator,
    signals: &SharedSignals,
    handoff: &EvolutionHandoff,
) {
    // The winner persists first. Failures are reported loudly but the
    // barriers are still honored, otherwise the cohort would strand.
    let mut published = false;
    if is_winner {
        match handoff.publish(learner.table()).await {
            Ok(()) => published = true,
            Err(err) => report_handoff_error(spec.index, &err),
        }
    }
    handoff.barrier().wait().await;

    if !is_winner {
        match handoff.adopt().await {
            Ok(table) => {
                if let Err(err) = learner.adopt_table(table) {
                    eprintln!("worker {}: adopting fittest table failed: {}", spec.index, err);
                }
            }
            Err(err) => report_handoff_error(spec.index, &err),
        }
    }
    handoff.barrier().wait().await;

    // All copies are done: every body returns to its starting
    // configuration and the winner opens the next generation.
    if let Err(err) = simulator.reset() {
        eprintln!("worker {}: body reset failed: {}", spec.index, err);
    }
    learner.reset_episode();
    if is_winner {
        if published {
            if let Err(err) = handoff.consume().await {
                report_handoff_error(spec.index, &err);
            }
        }
        signals.clear_goal();
    }
    handoff.barrier().wait().await;
}

fn report_handoff_error(worker: usize, err: &EvolutionError) {
    eprintln!("worker {}: generation hand-off error: {}", worker, err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Actuator, Agent, Sensor};
    use crate::config::LearnerConfig;
    use crate::logging::NoopSink;
    use crate::types::{ActionChoice, Response, ResponsePacket};

    fn test_learner(seed: u64) -> AgentLearner {
        let agent = Agent::new(
            vec![Actuator::new(0, vec![0, 1])],
            vec![Sensor::new(0, 8, 0.0, 8.0)],
        )
        .unwrap();
        let cfg = LearnerConfig {
            epsilon: 1.0,
            seed,
            ..LearnerConfig::default()
        };
        AgentLearner::new(agent, cfg, None).unwrap()
    }

    /// Counts iterations; every odd simulate call fails.
    struct FlakySim {
        calls: usize,
    }

    impl Simulator for FlakySim {
        fn simulate(&mut self, _action: &ActionChoice) -> Result<Response, SimulationError> {
            self.calls += 1;
            if self.calls % 2 == 1 {
                Err(SimulationError::new("transient backend fault"))
            } else {
                Ok(Response::new(vec![ResponsePacket::new(0, 1.0)]))
            }
        }

        fn reset(&mut self) -> Result<(), SimulationError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn transient_failures_do_not_terminate_the_worker() {
        let spec = WorkerSpec {
            index: 0,
            can_save: false,
            qtable_path: PathBuf::from("unused.json"),
            max_iterations: 10,
            pause_poll: Duration::from_millis(5),
            goal_threshold: f64::INFINITY,
        };
        let signals = Arc::new(SharedSignals::new());
        let handoff = Arc::new(EvolutionHandoff::new(PathBuf::from("unused-handoff"), 1));

        let sim = Box::new(FlakySim { calls: 0 });
        agent_task(
            spec,
            test_learner(1),
            sim,
            signals.clone(),
            handoff.clone(),
            Box::new(NoopSink),
        )
        .await;

        // Budget exhausted normally despite half the iterations failing.
        assert!(!signals.end_requested());
        assert_eq!(handoff.barrier().expected(), 0);
    }

    #[tokio::test]
    async fn iteration_budget_is_exact() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingSim {
            calls: Arc<AtomicUsize>,
        }
        impl Simulator for CountingSim {
            fn simulate(&mut self, _a: &ActionChoice) -> Result<Response, SimulationError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(Response::new(vec![ResponsePacket::new(0, 0.5)]))
            }
            fn reset(&mut self) -> Result<(), SimulationError> {
                Ok(())
            }
        }

        // The budget bounds the loop without any controller involvement.
        let spec = WorkerSpec {
            index: 0,
            can_save: false,
            qtable_path: PathBuf::from("unused.json"),
            max_iterations: 7,
            pause_poll: Duration::from_millis(5),
            goal_threshold: f64::INFINITY,
        };
        let signals = Arc::new(SharedSignals::new());
        let handoff = Arc::new(EvolutionHandoff::new(PathBuf::from("unused-handoff"), 1));

        let calls = Arc::new(AtomicUsize::new(0));
        let sim = Box::new(CountingSim {
            calls: calls.clone(),
        });
        agent_task(
            spec,
            test_learner(2),
            sim,
            signals,
            handoff,
            Box::new(NoopSink),
        )
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }
}
