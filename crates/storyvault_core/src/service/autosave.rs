//! Save debouncing for the editor state stores.
//!
//! Callers pass `Instant`s in explicitly; nothing here spawns timers.

use std::time::{Duration, Instant};

/// Delay between the last edit and the save it triggers.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveState {
    Idle,
    Scheduled(Instant),
    /// A write failed; the next check runs it again.
    Retry,
}

/// Trailing-edge debouncer: every `schedule` pushes the deadline out.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: SaveState,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SAVE_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: SaveState::Idle,
        }
    }

    /// (Re)arms the deadline to `now + delay`.
    pub fn schedule(&mut self, now: Instant) {
        self.state = SaveState::Scheduled(now + self.delay);
    }

    /// Keeps the save pending and due at the next check.
    pub fn retry(&mut self) {
        self.state = SaveState::Retry;
    }

    /// Unsaved changes exist (scheduled or waiting for a retry).
    pub fn is_pending(&self) -> bool {
        self.state != SaveState::Idle
    }

    pub fn due(&self, now: Instant) -> bool {
        match self.state {
            SaveState::Idle => false,
            SaveState::Scheduled(deadline) => now >= deadline,
            SaveState::Retry => true,
        }
    }

    /// Marks the pending save as written.
    pub fn cancel(&mut self) {
        self.state = SaveState::Idle;
    }
}
