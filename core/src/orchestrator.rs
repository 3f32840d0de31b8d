//! # Deployment Orchestrator
//!
//! Sequences one re-provisioning of a host:
//!
//! 1. Verify SSH access on the primary address.
//! 2. Ask before wiping a host that was provisioned before.
//! 3. Upload the boot configuration and install it as the NoCloud seed.
//! 4. Reset cloud-init and reboot.
//! 5. Wait for the host to go down, then for a short grace period.
//! 6. Reconnect on the primary address.
//! 7. Follow provisioning with the [`ConvergencePoller`].
//! 8. Run the health check.
//! 9. Report how to reach the host.
//!
//! Steps 3 and 4 overwrite whatever a previous run left behind, so running a
//! deployment twice is the same as running it once.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use converge_common::config::DeployConfig;
use converge_common::error::{ConnectivityError, DeployError};
use converge_common::network::address::AddressKind;
use converge_common::network::target::Target;
use converge_common::{info, success, warn};
use converge_protocols::status::{self, ConvergenceState};
use tokio::time::sleep;
use tracing::debug;

use crate::channel::{CommandOutput, RemoteChannel};
use crate::commands;
use crate::directory::MeshDirectory;
use crate::poller::{Convergence, ConvergencePoller};
use crate::resolver::{AddressResolver, ResolvedAddress};
use crate::retry::{RetryPolicy, poll_until};
use crate::session::Session;
use crate::switch::NetworkSwitch;
use crate::ui::{Operator, ProgressSink, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Converged(AccessReport),
    ConvergedWithWarnings(AccessReport),
    /// The operator declined to re-provision. Nothing was changed.
    Aborted,
}

impl Outcome {
    pub fn report(&self) -> Option<&AccessReport> {
        match self {
            Outcome::Converged(report) | Outcome::ConvergedWithWarnings(report) => Some(report),
            Outcome::Aborted => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessReport {
    pub primary_address: String,
    pub mesh_address: Option<String>,
    pub service_url: String,
    pub elapsed: Duration,
    pub health: Option<HealthReport>,
}

/// Output of the health command, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub output: String,
    pub exit_code: i32,
}

impl HealthReport {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// What `check` found without changing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub addresses: Vec<ResolvedAddress>,
    pub state: ConvergenceState,
    pub health: Option<HealthReport>,
}

pub struct Orchestrator {
    channel: Box<dyn RemoteChannel>,
    directory: Box<dyn MeshDirectory>,
    operator: Box<dyn Operator>,
    config: DeployConfig,
    health_command: String,
}

impl Orchestrator {
    pub fn new(
        channel: Box<dyn RemoteChannel>,
        directory: Box<dyn MeshDirectory>,
        operator: Box<dyn Operator>,
        config: DeployConfig,
    ) -> Self {
        Self {
            channel,
            directory,
            operator,
            config,
            health_command: commands::DEFAULT_HEALTH_CHECK.to_string(),
        }
    }

    pub fn with_health_command(mut self, command: impl Into<String>) -> Self {
        self.health_command = command.into();
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    fn resolver(&self) -> AddressResolver<'_> {
        AddressResolver::new(self.channel.as_ref(), self.directory.as_ref())
    }

    /// Runs the full sequence against `target`.
    pub async fn deploy(
        &self,
        target: &Target,
        user_data: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome, DeployError> {
        self.config.validate()?;
        tokio::fs::metadata(user_data)
            .await
            .map_err(|source| DeployError::BootConfig {
                path: user_data.to_path_buf(),
                source,
            })?;

        let mut session = Session::new(target.clone());
        let primary: &str = &target.primary_address;
        let unreachable = |e: ConnectivityError| DeployError::Unreachable {
            destination: target.destination(primary),
            reason: e.reason,
        };

        sink.step(Step::Verify);
        self.channel
            .execute(primary, commands::PROBE)
            .await
            .map_err(unreachable)?;
        success!("SSH access to {} works", target.destination(primary));

        sink.step(Step::Confirm);
        let marker: CommandOutput = self
            .channel
            .execute(primary, commands::PROVISIONED_MARKER)
            .await
            .map_err(unreachable)?;
        if marker.success() && !self.config.force && !self.confirm_reprovision(primary)? {
            info!("Leaving {primary} as it is");
            return Ok(Outcome::Aborted);
        }

        sink.step(Step::Upload);
        self.channel
            .upload(primary, user_data, commands::STAGING_PATH)
            .await
            .map_err(unreachable)?;
        let instance_id: String = format!("converge-{:016x}", rand::random::<u64>());
        let install: CommandOutput = self
            .channel
            .execute(primary, &commands::install_seed(&instance_id))
            .await
            .map_err(unreachable)?;
        if !install.success() {
            return Err(DeployError::SeedInstall {
                destination: target.destination(primary),
                output: install.combined(),
            });
        }
        debug!("seeded instance id {instance_id}");

        sink.step(Step::Reset);
        match self.channel.execute(primary, commands::RESET).await {
            Ok(output) if !output.success() => {
                debug!("reset exited {}: {}", output.exit_code, output.combined())
            }
            Ok(_) => {}
            Err(e) => debug!("reset dropped the connection: {e}"),
        }

        sink.step(Step::AwaitReboot);
        self.await_reboot(primary).await;

        sink.step(Step::Reconnect);
        self.reconnect(&session).await?;

        self.converge(&mut session, sink).await
    }

    /// Follows a provisioning that is already under way (steps 7 to 9).
    pub async fn watch(
        &self,
        target: &Target,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome, DeployError> {
        self.config.validate()?;
        let mut session = Session::new(target.clone());
        self.converge(&mut session, sink).await
    }

    /// Looks at a host without touching it.
    pub async fn inspect(&self, target: &Target) -> Result<Inspection, DeployError> {
        let primary: &str = &target.primary_address;
        let report: CommandOutput = self
            .channel
            .execute(primary, commands::STATUS)
            .await
            .map_err(|e| DeployError::Unreachable {
                destination: target.destination(primary),
                reason: e.reason,
            })?;

        Ok(Inspection {
            addresses: self.resolver().resolve(target).await,
            state: status::parse(&report.combined()),
            health: self.health_check(primary).await,
        })
    }

    /// Runs the health command. Failures are reported, never raised.
    pub async fn health_check(&self, address: &str) -> Option<HealthReport> {
        match self.channel.execute(address, &self.health_command).await {
            Ok(output) => Some(HealthReport {
                output: output.combined(),
                exit_code: output.exit_code,
            }),
            Err(e) => {
                warn!("Health check could not run: {e}");
                None
            }
        }
    }

    fn confirm_reprovision(&self, primary: &str) -> Result<bool, DeployError> {
        let prompt: String =
            format!("{primary} was provisioned before. Wipe cloud-init state and re-provision?");
        self.operator.confirm(&prompt).map_err(|e| {
            DeployError::Config(format!(
                "cannot ask for confirmation ({e:#}); rerun with --yes to re-provision"
            ))
        })
    }

    /// The reboot is only observed, never required.
    async fn await_reboot(&self, primary: &str) {
        let policy = RetryPolicy::new(self.config.down_interval, self.config.down_attempts);
        let down = poll_until(policy, move |_| async move {
            self.channel
                .execute(primary, commands::PROBE)
                .await
                .err()
                .map(|_| ())
        })
        .await;

        match down {
            Ok(()) => debug!("{primary} went down"),
            Err(exhausted) => warn!(
                "{primary} kept answering for {}s after the reset; the reboot may not have happened",
                exhausted.elapsed.as_secs()
            ),
        }
        sleep(self.config.reboot_grace).await;
    }

    async fn reconnect(&self, session: &Session) -> Result<(), DeployError> {
        let address: &str = session.active.as_str();
        let policy = RetryPolicy::new(self.config.watch.poll_interval, self.config.reconnect_budget());
        let back = poll_until(policy, move |_| async move {
            self.channel.execute(address, commands::PROBE).await.ok().map(|_| ())
        })
        .await;

        match back {
            Ok(()) => {
                success!("{address} is back");
                Ok(())
            }
            Err(exhausted) if self.config.watch.mesh_enabled => {
                warn!(
                    "{address} is not answering after {} attempts; continuing, the mesh address will take over",
                    exhausted.attempts
                );
                Ok(())
            }
            Err(exhausted) => Err(DeployError::Timeout {
                operation: "reconnect after reboot".to_string(),
                destination: session.destination(),
                elapsed: exhausted.elapsed,
            }),
        }
    }

    async fn converge(
        &self,
        session: &mut Session,
        sink: &mut dyn ProgressSink,
    ) -> Result<Outcome, DeployError> {
        sink.step(Step::Converge);
        let watch = &self.config.watch;
        let switch = NetworkSwitch::new(self.resolver(), watch);
        let convergence: Convergence = ConvergencePoller::new(self.channel.as_ref(), switch, watch)
            .run(session, sink)
            .await?;

        sink.step(Step::HealthCheck);
        let health: Option<HealthReport> = self.health_check(session.active.as_str()).await;

        sink.step(Step::Report);
        let report: AccessReport = self.access_report(session, health).await;

        Ok(match convergence {
            Convergence::Done => Outcome::Converged(report),
            Convergence::Recovered => Outcome::ConvergedWithWarnings(report),
        })
    }

    async fn access_report(&self, session: &Session, health: Option<HealthReport>) -> AccessReport {
        let mesh_address: Option<String> = if session.active.kind() == AddressKind::Mesh {
            Some(session.active.to_string())
        } else if self.config.watch.mesh_enabled {
            self.resolver()
                .ask_host(session.active.as_str())
                .await
                .map(|ip| ip.to_string())
        } else {
            None
        };

        AccessReport {
            primary_address: session.target.primary_address.clone(),
            service_url: service_url(session.active.as_str(), self.config.service_port),
            mesh_address,
            elapsed: session.elapsed(),
            health,
        }
    }
}

fn service_url(address: &str, port: u16) -> String {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("https://[{v6}]:{port}"),
        _ => format!("https://{address}:{port}"),
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
