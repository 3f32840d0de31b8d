//! Incremental reading of the remote install log.

/// Where cloud-init mirrors the output of every provisioning stage.
pub const INSTALL_LOG: &str = "/var/log/cloud-init-output.log";

/// Number of install-log lines already shown to the operator.
///
/// Only moves forward. A line counts once it is terminated by a newline, so a
/// line that is still being written is left for the next read.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressCursor {
    consumed: usize,
}

impl ProgressCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.consumed
    }

    /// 1-based number of the first line not yet shown, as `tail -n +N` expects.
    pub fn next_line(&self) -> usize {
        self.consumed + 1
    }

    /// Takes the complete lines of a chunk read from [`Self::next_line`] on and
    /// advances past them.
    pub fn consume<'a>(&mut self, chunk: &'a str) -> Vec<&'a str> {
        let lines: Vec<&'a str> = chunk
            .split_inclusive('\n')
            .filter(|line| line.ends_with('\n'))
            .map(|line| line.trim_end_matches('\n').trim_end_matches('\r'))
            .collect();
        self.consumed += lines.len();
        lines
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
