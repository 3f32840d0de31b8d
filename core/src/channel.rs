//! The remote command channel.
//!
//! [`RemoteChannel`] is the seam every remote side effect goes through. The
//! production implementation shells out to the system `ssh` and `scp`
//! binaries so the operator's own SSH configuration and agent apply.

use std::net::IpAddr;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use converge_common::config::ChannelConfig;
use converge_common::error::ConnectivityError;
use converge_common::network::target::{Credential, Target};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// `ssh` reserves this exit status for its own failures.
const SSH_FAILURE_STATUS: i32 = 255;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, as a person watching a terminal would see it.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Executes commands on, and copies files to, a remote host.
///
/// Implementations return [`ConnectivityError`] only when the host could not
/// be reached. A command that ran and failed is an `Ok` with a non-zero
/// [`CommandOutput::exit_code`].
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    async fn execute(&self, address: &str, command: &str)
    -> Result<CommandOutput, ConnectivityError>;

    async fn upload(
        &self,
        address: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), ConnectivityError>;
}

pub struct SshChannel {
    user: Option<String>,
    credential: Credential,
    config: ChannelConfig,
}

impl SshChannel {
    pub fn new(target: &Target, config: ChannelConfig) -> Self {
        Self {
            user: target.user.clone(),
            credential: target.credential.clone(),
            config,
        }
    }

    /// Options shared by `ssh` and `scp`.
    ///
    /// Every re-provisioning regenerates the host keys, so known_hosts is not
    /// consulted.
    fn common_args(&self, cmd: &mut Command) {
        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-o").arg(format!(
            "ConnectTimeout={}",
            self.config.connect_timeout.as_secs().max(1)
        ));
        cmd.arg("-o").arg("StrictHostKeyChecking=no");
        cmd.arg("-o").arg("UserKnownHostsFile=/dev/null");
        cmd.arg("-o").arg("LogLevel=ERROR");
        if let Credential::IdentityFile(path) = &self.credential {
            cmd.arg("-i").arg(path);
        }
    }

    fn destination(&self, address: &str) -> String {
        match &self.user {
            Some(user) => format!("{user}@{address}"),
            None => address.to_string(),
        }
    }

    async fn run(&self, mut cmd: Command, address: &str) -> Result<Output, ConnectivityError> {
        cmd.kill_on_drop(true);
        let budget: Duration = self.config.connect_timeout + self.config.command_timeout;

        match timeout(budget, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ConnectivityError::new(address, format!("failed to spawn: {e}"))),
            Err(_) => Err(ConnectivityError::new(
                address,
                format!("no answer within {}s", budget.as_secs()),
            )),
        }
    }
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn execute(
        &self,
        address: &str,
        command: &str,
    ) -> Result<CommandOutput, ConnectivityError> {
        let mut cmd = Command::new("ssh");
        self.common_args(&mut cmd);
        if let Some(port) = self.config.ssh_port {
            cmd.arg("-p").arg(port.to_string());
        }
        cmd.arg(self.destination(address));
        cmd.arg(command);

        debug!("ssh {address}: {command}");
        let output: Output = self.run(cmd, address).await?;
        let stderr: String = String::from_utf8_lossy(&output.stderr).into_owned();

        let Some(exit_code) = output.status.code() else {
            return Err(ConnectivityError::new(address, "ssh was killed by a signal"));
        };
        if exit_code == SSH_FAILURE_STATUS {
            return Err(ConnectivityError::new(address, last_line(&stderr)));
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
            exit_code,
        })
    }

    async fn upload(
        &self,
        address: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), ConnectivityError> {
        let mut cmd = Command::new("scp");
        self.common_args(&mut cmd);
        if let Some(port) = self.config.ssh_port {
            cmd.arg("-P").arg(port.to_string());
        }
        cmd.arg(local_path);
        cmd.arg(format!("{}:{remote_path}", self.destination(&scp_host(address))));

        debug!("scp {} -> {address}:{remote_path}", local_path.display());
        let output: Output = self.run(cmd, address).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConnectivityError::new(address, last_line(&stderr)));
        }
        Ok(())
    }
}

/// `scp` needs brackets around IPv6 literals to tell them from the path.
fn scp_host(address: &str) -> String {
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => address.to_string(),
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .unwrap_or("connection failed")
        .to_string()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
