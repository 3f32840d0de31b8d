//! The `cloud-init status` report.
//!
//! The report is loosely-typed text produced by the boot-time executor. It is
//! turned into a [`ConvergenceState`] here and nowhere else.

use std::fmt;

const STATUS_KEY: &str = "status:";
const RECOVERABLE: &str = "recoverable";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConvergenceState {
    NotStarted,
    Running,
    Done,
    /// Terminal failure of the boot-time executor.
    Error,
    /// Terminal, but every error was recoverable. Treated as success.
    ErrorRecoverable,
    /// Anything the parser did not recognise, kept verbatim.
    Unknown(String),
}

impl fmt::Display for ConvergenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceState::NotStarted => write!(f, "not started"),
            ConvergenceState::Running => write!(f, "running"),
            ConvergenceState::Done => write!(f, "done"),
            ConvergenceState::Error => write!(f, "error"),
            ConvergenceState::ErrorRecoverable => write!(f, "error (recoverable)"),
            ConvergenceState::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Parses the output of `cloud-init status`.
///
/// The first line containing `status:` decides. An `error` value is
/// recoverable when that same line carries the word `recoverable`.
pub fn parse(report: &str) -> ConvergenceState {
    let Some(line) = report
        .lines()
        .map(str::trim)
        .find(|line| line.to_ascii_lowercase().contains(STATUS_KEY))
    else {
        let raw: &str = report.trim();
        return ConvergenceState::Unknown(if raw.is_empty() { "<empty>" } else { raw }.to_string());
    };

    let lower: String = line.to_ascii_lowercase();
    let value: &str = lower
        .split_once(STATUS_KEY)
        .map(|(_, value)| value.trim())
        .unwrap_or_default();

    match value {
        "done" => ConvergenceState::Done,
        "running" => ConvergenceState::Running,
        "not started" => ConvergenceState::NotStarted,
        v if v.starts_with("error") && v.contains(RECOVERABLE) => ConvergenceState::ErrorRecoverable,
        v if v.starts_with("error") => ConvergenceState::Error,
        _ => ConvergenceState::Unknown(line.to_string()),
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
