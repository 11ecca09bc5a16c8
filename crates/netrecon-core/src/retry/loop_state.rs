//! Loop state tracking for the retry executor.

use std::time::{Duration, Instant};

/// Where the retry loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Still sending and evaluating.
    Running,
    /// No conditions remain pending.
    Satisfied,
    /// The retry budget ran out (or the loop was interrupted) with conditions pending.
    Exhausted,
}

impl RetryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryState::Running => "running",
            RetryState::Satisfied => "satisfied",
            RetryState::Exhausted => "exhausted",
        }
    }

    /// Returns true if the loop stopped because every condition held.
    pub fn is_success(&self) -> bool {
        matches!(self, RetryState::Satisfied)
    }
}

/// Counters for one run of the retry loop.
#[derive(Debug)]
pub struct LoopState {
    pub state: RetryState,
    /// Retries left before the loop gives up.
    pub remaining: u32,
    /// Rounds sent to the device so far.
    pub sends: u32,
    /// Set when the interrupt signal cut the loop short.
    pub interrupted: bool,
    pub started_at: Instant,
}

impl LoopState {
    pub fn new(retries: u32) -> Self {
        Self {
            state: RetryState::Running,
            remaining: retries,
            sends: 0,
            interrupted: false,
            started_at: Instant::now(),
        }
    }

    /// Returns the elapsed time since the loop started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}
