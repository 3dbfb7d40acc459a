// src/main.rs
//
// Command-line entrypoint for ambler.
//
// Spawns N learning workers over the deterministic rail body and hands
// control to the console loop (p: pause, s: save, r: resume, q: stop).
// Deterministic runs via --seed; worker RNGs are offset by worker index.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser};

use ambler::agent::{Actuator, Sensor};
use ambler::config::ManagerConfig;
use ambler::console::run_console;
use ambler::manager::AgentManager;
use ambler::simulator::{RailSimulator, Simulator, SimulatorFactory};
use ambler::types::BodyShape;

#[derive(Debug, Parser)]
#[command(
    name = "ambler",
    about = "Multi-agent tabular Q-learning harness (rail-crawler body)",
    version
)]
struct Args {
    /// Number of learning workers to run.
    #[arg(long, default_value_t = 2)]
    agents: usize,

    /// Q-table save path for the designated saver worker.
    #[arg(long, default_value = "qtable.json")]
    qtable: PathBuf,

    /// Iteration budget per worker; 0 runs until stopped.
    #[arg(long, default_value_t = 0)]
    iterations: u64,

    /// RNG seed for deterministic policies.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Progress threshold marking a generation's fittest worker, in cm.
    #[arg(long, default_value_t = 3000.0)]
    goal: f64,

    /// Directory for per-worker JSONL step logs.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// The default crawler rig: a swing joint and a contact joint, with a
/// position sensor and one angle sensor per joint.
fn crawler_rig() -> (Vec<Actuator>, Vec<Sensor>) {
    let actuators = vec![
        Actuator::new(0, vec![-45, 0, 45]), // drive/swing joint
        Actuator::new(1, vec![-30, 30]),    // contact joint
    ];
    let sensors = vec![
        Sensor::new(0, 40, 0.0, 4000.0), // rail position, cm
        Sensor::new(1, 3, -45.0, 45.0),  // drive joint angle
        Sensor::new(2, 2, -30.0, 30.0),  // contact joint angle
    ];
    (actuators, sensors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (actuators, sensors) = crawler_rig();
    let body = BodyShape::default();

    let mut cfg = ManagerConfig::default();
    cfg.qtable_path = args.qtable;
    cfg.log_dir = args.log_dir;
    cfg.worker.max_iterations = args.iterations;
    cfg.worker.goal_threshold = args.goal;
    cfg.learner.seed = args.seed;

    if args.verbose > 0 {
        println!(
            "ambler starting: agents={} seed={} goal_cm={} iterations={}",
            args.agents, args.seed, args.goal, cfg.worker.max_iterations
        );
    }

    let rig_actuators = actuators.clone();
    let rig_sensors = sensors.clone();
    let factory: SimulatorFactory = Arc::new(move |_index, shape, _draw_graphics| {
        Box::new(RailSimulator::new(&rig_actuators, &rig_sensors, shape)) as Box<dyn Simulator>
    });

    let mut manager = AgentManager::new(cfg, actuators, sensors, body, factory);
    manager.start(args.agents)?;

    run_console(&mut manager).await?;

    // run_console stops on 'q'; cover end-of-input as well.
    manager.stop().await;
    Ok(())
}
