//! The single bounded waiting primitive.
//!
//! Waiting for a reboot to take the host down, waiting for SSH to come back and
//! waiting for a mesh peer to appear are all the same loop: try, sleep a fixed
//! interval, give up after a fixed number of attempts.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Every attempt came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Calls `attempt` (with the 1-based attempt number) until it yields a value.
///
/// Sleeps `interval` between attempts, never after the last one.
pub async fn poll_until<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start: Instant = Instant::now();

    for n in 1..=policy.max_attempts {
        if let Some(value) = attempt(n).await {
            return Ok(value);
        }
        if n < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    Err(Exhausted {
        attempts: policy.max_attempts,
        elapsed: start.elapsed(),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
