//! # Failure Taxonomy
//!
//! Every fatal condition of a run ends up as a [`DeployError`]. Each message
//! closes with the command the operator should run next, so the variants carry
//! the SSH destination needed to build it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::network::address::AlreadySwitched;

/// The remote command channel could not reach the host.
///
/// This is the only error a channel returns; a remote command that runs and
/// exits non-zero is a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{address} is unreachable: {reason}")]
pub struct ConnectivityError {
    pub address: String,
    pub reason: String,
}

impl ConnectivityError {
    pub fn new(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(
        "cannot reach {destination} over ssh: {reason}\n  next: ssh -v {destination} true"
    )]
    Unreachable { destination: String, reason: String },

    #[error(
        "{destination} stopped answering for {failures} consecutive polls\n  \
         next: ssh {destination} 'cloud-init status --long'"
    )]
    Connectivity { destination: String, failures: u32 },

    #[error(
        "cloud-init reported a fatal error on {destination}\n{context}\n  \
         next: ssh {destination} 'sudo less /var/log/cloud-init-output.log'"
    )]
    Convergence { destination: String, context: String },

    #[error(
        "no mesh peer named '{hint}' appeared after {attempts} directory queries\n  \
         likely causes:\n    \
         - the one-time mesh auth key expired or was already consumed\n    \
         - the host never reached the mesh join step of its boot configuration\n  \
         next: open the VM console and run 'sudo cloud-init status --long'"
    )]
    Discovery { hint: String, attempts: u32 },

    #[error(
        "{operation} did not finish after {}s\n  next: ssh {destination} 'cloud-init status --long'",
        .elapsed.as_secs()
    )]
    Timeout {
        operation: String,
        destination: String,
        elapsed: Duration,
    },

    #[error(
        "installing the boot configuration on {destination} failed:\n{output}\n  \
         next: ssh {destination} 'sudo ls -l /var/lib/cloud/seed/nocloud'"
    )]
    SeedInstall { destination: String, output: String },

    #[error(transparent)]
    AddressSwitch(#[from] AlreadySwitched),

    #[error("cannot read boot configuration {}: {source}", .path.display())]
    BootConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
