use std::time::Duration;

use crate::error::DeployError;

/// Terminal behaviour shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Suppresses headers and the banner. `2` also hides remote log lines.
    pub quiet: u8,
    /// Enables `debug` level events.
    pub verbose: bool,
}

/// How remote commands are issued.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Upper bound for establishing one SSH connection.
    pub connect_timeout: Duration,
    /// Upper bound for one remote command once connected.
    pub command_timeout: Duration,
    pub ssh_port: Option<u16>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(120),
            ssh_port: None,
        }
    }
}

/// Tunables for the convergence poller and the network-identity switch.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Consecutive connectivity failures that trigger the address switch.
    pub switch_threshold: u32,
    /// Consecutive connectivity failures after which the run is abandoned
    /// when no switch is possible.
    pub give_up_threshold: u32,
    pub discovery_attempts: u32,
    pub discovery_wait: Duration,
    /// Whether the host is expected to join the mesh during provisioning.
    pub mesh_enabled: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
            switch_threshold: 6,
            give_up_threshold: 24,
            discovery_attempts: 12,
            discovery_wait: Duration::from_secs(10),
            mesh_enabled: true,
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.poll_interval.is_zero() {
            return Err(DeployError::Config("poll interval must be positive".into()));
        }
        if self.timeout < self.poll_interval {
            return Err(DeployError::Config(format!(
                "timeout ({}s) is shorter than the poll interval ({}s)",
                self.timeout.as_secs(),
                self.poll_interval.as_secs()
            )));
        }
        if self.switch_threshold == 0 || self.give_up_threshold == 0 {
            return Err(DeployError::Config("failure thresholds must be positive".into()));
        }
        if self.discovery_attempts == 0 {
            return Err(DeployError::Config("discovery needs at least one attempt".into()));
        }
        Ok(())
    }
}

/// Tunables for the full deployment sequence.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub watch: WatchConfig,
    /// Re-provision without asking when the host was provisioned before.
    pub force: bool,
    pub down_interval: Duration,
    pub down_attempts: u32,
    pub reboot_grace: Duration,
    /// Reconnect budget when the mesh will not take over access.
    pub reconnect_attempts: u32,
    /// Reconnect budget when the mesh switch is the recovery path.
    pub reconnect_attempts_mesh: u32,
    pub service_port: u16,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            force: false,
            down_interval: Duration::from_secs(2),
            down_attempts: 30,
            reboot_grace: Duration::from_secs(10),
            reconnect_attempts: 60,
            reconnect_attempts_mesh: 12,
            service_port: 6443,
        }
    }
}

impl DeployConfig {
    pub fn reconnect_budget(&self) -> u32 {
        if self.watch.mesh_enabled {
            self.reconnect_attempts_mesh
        } else {
            self.reconnect_attempts
        }
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        self.watch.validate()?;
        if self.down_attempts == 0 || self.reconnect_budget() == 0 {
            return Err(DeployError::Config("wait loops need at least one attempt".into()));
        }
        Ok(())
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
