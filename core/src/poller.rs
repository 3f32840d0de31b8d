//! # Convergence Poller
//!
//! Follows the remote cloud-init job until it settles.
//!
//! Every tick is three remote commands against the session's active address:
//! a probe, the status query and a read of the install log past the cursor.
//! Only channel failures count against the failure budget, and any command
//! that gets through resets it. The whole run, including a tick in flight and
//! an address switch, is bounded by the configured timeout. A status query that
//! runs and exits non-zero is an answer, and cloud-init exits non-zero exactly
//! when it has something to report.

use std::collections::HashSet;

use converge_common::config::WatchConfig;
use converge_common::error::{ConnectivityError, DeployError};
use converge_common::{success, warn};
use converge_protocols::status::{self, ConvergenceState};
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::debug;

use crate::channel::{CommandOutput, RemoteChannel};
use crate::commands;
use crate::session::Session;
use crate::switch::NetworkSwitch;
use crate::ui::ProgressSink;

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Done,
    /// cloud-init finished with recoverable errors only.
    Recovered,
}

pub struct ConvergencePoller<'a> {
    channel: &'a dyn RemoteChannel,
    switch: NetworkSwitch<'a>,
    config: &'a WatchConfig,
}

impl<'a> ConvergencePoller<'a> {
    pub fn new(
        channel: &'a dyn RemoteChannel,
        switch: NetworkSwitch<'a>,
        config: &'a WatchConfig,
    ) -> Self {
        Self {
            channel,
            switch,
            config,
        }
    }

    pub async fn run(
        &self,
        session: &mut Session,
        sink: &mut dyn ProgressSink,
    ) -> Result<Convergence, DeployError> {
        let start: Instant = Instant::now();
        let deadline: Instant = start + self.config.timeout;
        let mut warned: HashSet<String> = HashSet::new();

        loop {
            if Instant::now() >= deadline {
                return Err(timed_out(session, start));
            }

            match timeout_at(deadline, self.tick(session, sink, &mut warned)).await {
                Ok(tick) => {
                    if let Some(convergence) = tick? {
                        return Ok(convergence);
                    }
                }
                Err(_) => return Err(timed_out(session, start)),
            }

            sleep_until(deadline.min(Instant::now() + self.config.poll_interval)).await;
        }
    }

    async fn tick(
        &self,
        session: &mut Session,
        sink: &mut dyn ProgressSink,
        warned: &mut HashSet<String>,
    ) -> Result<Option<Convergence>, DeployError> {
        let address: String = session.active.to_string();

        if let Err(e) = self.channel.execute(&address, commands::PROBE).await {
            self.on_failure(session, sink, e).await?;
            return Ok(None);
        }
        session.budget.reset();

        let report: CommandOutput = match self.channel.execute(&address, commands::STATUS).await {
            Ok(output) => output,
            Err(e) => {
                self.on_failure(session, sink, e).await?;
                return Ok(None);
            }
        };

        let log_read: String = commands::read_log(&session.cursor);
        match self.channel.execute(&address, &log_read).await {
            Ok(output) => {
                for line in session.cursor.consume(&output.stdout) {
                    sink.log_line(line);
                }
            }
            Err(e) => {
                self.on_failure(session, sink, e).await?;
                return Ok(None);
            }
        }

        let state: ConvergenceState = status::parse(&report.combined());
        sink.state(&state, session.cursor.position());

        match state {
            ConvergenceState::Done => {
                success!("Provisioning finished on {address}");
                Ok(Some(Convergence::Done))
            }
            ConvergenceState::ErrorRecoverable => {
                warn!("Provisioning finished on {address} with recoverable errors");
                Ok(Some(Convergence::Recovered))
            }
            ConvergenceState::Error => Err(DeployError::Convergence {
                destination: session.destination(),
                context: self.failure_context(&address, &report).await,
            }),
            ConvergenceState::Unknown(raw) => {
                if warned.insert(raw.clone()) {
                    warn!("Unrecognised cloud-init status '{raw}', still waiting");
                }
                Ok(None)
            }
            ConvergenceState::NotStarted | ConvergenceState::Running => Ok(None),
        }
    }

    /// Counts a channel failure and decides between waiting, switching and
    /// giving up.
    async fn on_failure(
        &self,
        session: &mut Session,
        sink: &mut dyn ProgressSink,
        error: ConnectivityError,
    ) -> Result<(), DeployError> {
        let failures: u32 = session.budget.record_failure();
        debug!("connectivity failure {failures}: {error}");

        if self.switch.should_fire(session) {
            let from: String = session.active.to_string();
            let to = self.switch.engage(session).await?;
            success!("Switched from {from} to mesh address {to}");
            sink.address_switched(&from, &to.to_string());
            return Ok(());
        }

        if failures >= self.config.give_up_threshold {
            return Err(DeployError::Connectivity {
                destination: session.destination(),
                failures,
            });
        }
        Ok(())
    }

    /// `cloud-init status --long`, or the short report when that is unavailable.
    async fn failure_context(&self, address: &str, report: &CommandOutput) -> String {
        match self.channel.execute(address, commands::STATUS_LONG).await {
            Ok(output) if !output.combined().is_empty() => output.combined(),
            _ => report.combined(),
        }
    }
}

/// The deadline fires inside a tick or between two of them.
fn timed_out(session: &Session, start: Instant) -> DeployError {
    DeployError::Timeout {
        operation: "provisioning".to_string(),
        destination: session.destination(),
        elapsed: start.elapsed(),
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
