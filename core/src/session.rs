//! Everything one run mutates, in one place.

use std::time::Duration;

use converge_common::network::address::ActiveAddress;
use converge_common::network::target::Target;
use converge_protocols::log::ProgressCursor;
use tokio::time::Instant;

/// Consecutive connectivity failures. Any successful remote command resets it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailureBudget {
    consecutive: u32,
}

impl FailureBudget {
    /// Returns the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive += 1;
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// State of a single run. The poller and the switch borrow it mutably in turn.
#[derive(Debug)]
pub struct Session {
    pub target: Target,
    pub active: ActiveAddress,
    pub cursor: ProgressCursor,
    pub budget: FailureBudget,
    started: Instant,
}

impl Session {
    pub fn new(target: Target) -> Self {
        Self {
            active: ActiveAddress::new(target.primary_address.clone()),
            target,
            cursor: ProgressCursor::new(),
            budget: FailureBudget::default(),
            started: Instant::now(),
        }
    }

    /// SSH destination for the active address.
    pub fn destination(&self) -> String {
        self.target.destination(self.active.as_str())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
