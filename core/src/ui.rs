//! Seams towards the person running the tool.

use std::fmt;

use converge_protocols::status::ConvergenceState;

/// The deployment sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Verify,
    Confirm,
    Upload,
    Reset,
    AwaitReboot,
    Reconnect,
    Converge,
    HealthCheck,
    Report,
}

impl Step {
    pub fn title(&self) -> &'static str {
        match self {
            Step::Verify => "Verifying SSH access",
            Step::Confirm => "Checking for a previous provisioning",
            Step::Upload => "Uploading boot configuration",
            Step::Reset => "Resetting cloud-init and rebooting",
            Step::AwaitReboot => "Waiting for the reboot",
            Step::Reconnect => "Reconnecting",
            Step::Converge => "Waiting for provisioning",
            Step::HealthCheck => "Running health check",
            Step::Report => "Collecting access information",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Receives progress as it happens.
pub trait ProgressSink: Send {
    /// One install-log line, in cursor order. Called exactly once per line.
    fn log_line(&mut self, line: &str);

    fn state(&mut self, _state: &ConvergenceState, _cursor: usize) {}

    fn address_switched(&mut self, _from: &str, _to: &str) {}

    fn step(&mut self, _step: Step) {}
}

/// Answers yes/no questions.
pub trait Operator: Send + Sync {
    fn confirm(&self, prompt: &str) -> anyhow::Result<bool>;
}
