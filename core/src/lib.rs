//! # Provisioning Convergence Watcher
//!
//! Drives a single VM from "boot configuration uploaded" to "provisioned and
//! verified".
//!
//! * [`orchestrator`]: the deployment sequence and final report.
//! * [`poller`]: tracks the remote cloud-init job until it settles.
//! * [`switch`]: moves the run onto the mesh address when the public one dies.
//! * [`resolver`]: finds the addresses a host can be reached on.
//! * [`channel`] / [`directory`]: the remote shell and the local mesh client.
//!
//! Everything runs on one logical thread of control; see [`retry`] for the one
//! waiting primitive every bounded loop is built on.

pub mod channel;
pub mod commands;
pub mod directory;
pub mod orchestrator;
pub mod poller;
pub mod resolver;
pub mod retry;
pub mod session;
pub mod switch;
pub mod ui;

pub use channel::{CommandOutput, RemoteChannel, SshChannel};
pub use directory::{MeshDirectory, TailscaleDirectory};
pub use orchestrator::{AccessReport, HealthReport, Inspection, Orchestrator, Outcome};
pub use poller::{Convergence, ConvergencePoller};
pub use session::Session;
pub use ui::{Operator, ProgressSink, Step};
