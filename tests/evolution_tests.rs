// tests/evolution_tests.rs
//
// End-to-end generation hand-off tests.
//
// These tests verify:
// - with two workers racing toward the goal, generations complete: the
//   fittest worker's table is published, adopted, and the reserved file
//   is consumed afterward
// - every worker's body is reset once per completed generation
// - the goal flag is cleared so the next generation can start
// - a worker exiting mid-session never strands the cohort

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ambler::agent::{Actuator, Sensor};
use ambler::config::ManagerConfig;
use ambler::manager::AgentManager;
use ambler::simulator::{SimulationError, Simulator, SimulatorFactory};
use ambler::types::{ActionChoice, BodyShape, Response, ResponsePacket};

/// Test body that advances a fixed stride per step and counts resets.
struct StrideSim {
    stride: f64,
    x: f64,
    resets: Arc<AtomicUsize>,
}

impl Simulator for StrideSim {
    fn simulate(&mut self, _action: &ActionChoice) -> Result<Response, SimulationError> {
        self.x += self.stride;
        Ok(Response::new(vec![ResponsePacket::new(0, self.x)]))
    }

    fn reset(&mut self) -> Result<(), SimulationError> {
        self.x = 0.0;
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn rig() -> (Vec<Actuator>, Vec<Sensor>) {
    (
        vec![Actuator::new(0, vec![0, 1])],
        vec![Sensor::new(0, 10, 0.0, 10.0)],
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn generations_complete_and_consume_the_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let handoff_path = dir.path().join("fittest.json");

    let mut cfg = ManagerConfig::default();
    cfg.qtable_path = dir.path().join("qtable.json");
    cfg.handoff_path = handoff_path.clone();
    cfg.save_poll_ms = 5;
    cfg.worker.pause_poll_ms = 5;
    cfg.worker.goal_threshold = 3.0; // a handful of strides away
    cfg.worker.max_iterations = 400;

    let resets = Arc::new(AtomicUsize::new(0));
    let resets_for_factory = resets.clone();
    // Worker 0 strides twice as fast, so it wins the first generation
    // deterministically.
    let factory: SimulatorFactory = Arc::new(move |index, _shape, _draw| {
        let stride = if index == 0 { 1.0 } else { 0.5 };
        Box::new(StrideSim {
            stride,
            x: 0.0,
            resets: resets_for_factory.clone(),
        }) as Box<dyn Simulator>
    });

    let (actuators, sensors) = rig();
    let mut m = AgentManager::new(cfg, actuators, sensors, BodyShape::default(), factory);
    m.start(2).unwrap();

    // Both workers run to their budget; generations happen along the way.
    let deadline = tokio::time::timeout(Duration::from_secs(30), async {
        while m.live_workers() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(deadline.is_ok(), "workers never finished their budget");

    // At least one full generation ran: every completed hand-off resets
    // each live participant's body exactly once.
    assert!(
        resets.load(Ordering::SeqCst) >= 2,
        "expected at least one full generation of body resets, saw {}",
        resets.load(Ordering::SeqCst)
    );

    // The reserved location was consumed; a lingering file would make the
    // next session's first hand-off fail loudly.
    assert!(
        !handoff_path.exists(),
        "hand-off file left unconsumed at {}",
        handoff_path.display()
    );

    // The last completed generation cleared the goal flag.
    assert!(!m.signals().goal_reached());

    m.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn early_exiting_worker_does_not_strand_the_cohort() {
    let dir = tempfile::tempdir().unwrap();

    let mut cfg = ManagerConfig::default();
    cfg.qtable_path = dir.path().join("qtable.json");
    cfg.handoff_path = dir.path().join("fittest.json");
    cfg.worker.pause_poll_ms = 5;
    cfg.worker.goal_threshold = 3.0;
    // Worker budgets differ: one exits long before the other can finish
    // a generation, which under a fixed-size barrier would deadlock.
    cfg.worker.max_iterations = 200;

    let resets = Arc::new(AtomicUsize::new(0));
    let resets_for_factory = resets.clone();
    let factory: SimulatorFactory = Arc::new(move |index, _shape, _draw| {
        // Worker 1 never makes progress, so it can only ever be a loser
        // in the hand-off.
        let stride = if index == 0 { 1.0 } else { 0.0 };
        Box::new(StrideSim {
            stride,
            x: 0.0,
            resets: resets_for_factory.clone(),
        }) as Box<dyn Simulator>
    });

    let (actuators, sensors) = rig();
    let mut m = AgentManager::new(cfg, actuators, sensors, BodyShape::default(), factory);
    m.start(2).unwrap();

    // stop() must complete even if workers are in or around a hand-off.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopped = tokio::time::timeout(Duration::from_secs(30), m.stop()).await;
    assert!(stopped.is_ok(), "stop() hung on a stranded barrier");
    assert_eq!(m.live_workers(), 0);
}
