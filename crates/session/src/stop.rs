//! Stop requests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Quit key or window close
    UserQuit,
    /// Ctrl-C / SIGINT
    Interrupt,
    /// Configured tick budget reached
    MaxTicks,
    /// Setup or loop failure
    Failed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UserQuit => "user quit",
            Self::Interrupt => "interrupted",
            Self::MaxTicks => "tick limit reached",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Shared stop flag, checked once per loop iteration
///
/// The first reason recorded wins.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, reason: StopReason) {
        let mut current = self.reason.lock().unwrap();
        if current.is_none() {
            *current = Some(reason);
        }
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.reason.lock().unwrap()
    }
}
