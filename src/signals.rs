// src/signals.rs
//
// Shared coordination state.
//
// One instance per running session: created by the controller when workers
// start, polled by every worker once per iteration, dropped when the
// session ends. All accesses are SeqCst so a pause() followed by a save()
// is observed by workers in that order. The goal flag transition is a
// single compare-and-set; a read-then-write would let two workers both
// believe they won.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Progress of a requested Q-table save, carried between the controller
/// and the designated saver. Requested -> Done | Failed, acknowledged
/// back to Idle by the controller only, so a failed write is never
/// reported as a completed save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// No save in flight.
    Idle,
    /// The controller asked for a save the saver has not finished.
    Requested,
    /// The saver wrote the table successfully.
    Done,
    /// The saver attempted the write and it failed.
    Failed,
}

const SAVE_IDLE: u8 = 0;
const SAVE_REQUESTED: u8 = 1;
const SAVE_DONE: u8 = 2;
const SAVE_FAILED: u8 = 3;

/// Process-wide flags the controller sets and workers poll.
///
/// Writers: the controller, except that the designated saver records the
/// save outcome after attempting a save and the generation winner clears
/// `goal_reached` after the hand-off completes.
#[derive(Debug, Default)]
pub struct SharedSignals {
    end_requested: AtomicBool,
    pause_requested: AtomicBool,
    save_state: AtomicU8,
    use_evolution_goal: AtomicBool,
    goal_reached: AtomicBool,
}

impl SharedSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_end(&self) {
        self.end_requested.store(true, Ordering::SeqCst);
    }

    pub fn end_requested(&self) -> bool {
        self.end_requested.load(Ordering::SeqCst)
    }

    pub fn request_pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn clear_pause(&self) {
        self.pause_requested.store(false, Ordering::SeqCst);
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    pub fn request_save(&self) {
        self.save_state.store(SAVE_REQUESTED, Ordering::SeqCst);
    }

    /// Whether a save request is still awaiting the saver.
    pub fn save_requested(&self) -> bool {
        self.save_state.load(Ordering::SeqCst) == SAVE_REQUESTED
    }

    pub fn save_state(&self) -> SaveState {
        match self.save_state.load(Ordering::SeqCst) {
            SAVE_REQUESTED => SaveState::Requested,
            SAVE_DONE => SaveState::Done,
            SAVE_FAILED => SaveState::Failed,
            _ => SaveState::Idle,
        }
    }

    /// Record the saver's attempt. Only an outstanding request is
    /// updated; a request the controller already withdrew stays
    /// withdrawn.
    pub fn record_save_outcome(&self, ok: bool) {
        let outcome = if ok { SAVE_DONE } else { SAVE_FAILED };
        let _ = self.save_state.compare_exchange(
            SAVE_REQUESTED,
            outcome,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Consume a finished (or abandoned) save, returning to Idle.
    /// Controller side only.
    pub fn acknowledge_save(&self) {
        self.save_state.store(SAVE_IDLE, Ordering::SeqCst);
    }

    pub fn set_use_evolution_goal(&self, enabled: bool) {
        self.use_evolution_goal.store(enabled, Ordering::SeqCst);
    }

    pub fn use_evolution_goal(&self) -> bool {
        self.use_evolution_goal.load(Ordering::SeqCst)
    }

    /// Attempt the single false->true transition of the goal flag.
    /// Returns true for exactly one caller per generation: the fittest
    /// worker. First-writer-wins under any interleaving.
    pub fn claim_goal(&self) -> bool {
        self.goal_reached
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached.load(Ordering::SeqCst)
    }

    /// Clear the goal flag to open the next generation. Called by the
    /// winner once every other worker has adopted its table.
    pub fn clear_goal(&self) {
        self.goal_reached.store(false, Ordering::SeqCst);
    }
}
