// src/logging.rs
//
// Telemetry sinks for ambler.
// - TrainingSink: trait used by the worker loop
// - NoopSink:     discards all steps
// - FileSink:     writes one JSON line per step for offline analysis

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// One completed learning step, as seen after the estimator update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Encoded state index after the transition.
    pub state: usize,
    /// Flat index of the executed action.
    pub action: usize,
    /// Reward produced by the transition.
    pub reward: f64,
    /// Raw progress-sensor reading.
    pub progress: f64,
}

/// Abstract sink for per-step telemetry.
pub trait TrainingSink: Send {
    fn log_step(&mut self, worker: usize, iteration: u64, record: &StepRecord);
}

/// Sink that discards all steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TrainingSink for NoopSink {
    fn log_step(&mut self, _worker: usize, _iteration: u64, _record: &StepRecord) {
        // intentionally no-op
    }
}

/// JSONL file sink. Each step is a single JSON object on its own line;
/// the payload is small and numeric, so it is encoded by hand.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Create a new sink writing to `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl TrainingSink for FileSink {
    fn log_step(&mut self, worker: usize, iteration: u64, record: &StepRecord) {
        let line = format!(
            "{{\"worker\":{},\"iteration\":{},\"state\":{},\"action\":{},\"reward\":{},\"progress\":{}}}",
            worker, iteration, record.state, record.action, record.reward, record.progress
        );
        // A failed telemetry write must not disturb the learning loop.
        let _ = writeln!(self.writer, "{}", line);
        let _ = self.writer.flush();
    }
}
