pub mod check;
pub mod deploy;
pub mod summary;
pub mod watch;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use converge_common::config::{ChannelConfig, DeployConfig, WatchConfig};
use converge_common::network::target::{Credential, Target};
use converge_core::{Orchestrator, SshChannel, TailscaleDirectory};

use crate::terminal::prompt::TerminalOperator;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Re-provisions a VM with cloud-init and watches it converge.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output. Repeat to also hide the remote install log
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Show debug events
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a boot configuration, reboot and wait for provisioning
    #[command(alias = "d")]
    Deploy {
        #[command(flatten)]
        host: HostArgs,
        #[command(flatten)]
        watch: WatchArgs,
        /// Rendered cloud-init user data to install
        #[arg(short, long)]
        user_data: PathBuf,
        /// Re-provision without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Follow a provisioning that is already running
    #[command(alias = "w")]
    Watch {
        #[command(flatten)]
        host: HostArgs,
        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Show addresses, cloud-init status and health of a host
    #[command(alias = "c")]
    Check {
        #[command(flatten)]
        host: HostArgs,
    },
}

impl Commands {
    pub fn host(&self) -> &HostArgs {
        match self {
            Commands::Deploy { host, .. } | Commands::Watch { host, .. } | Commands::Check { host } => {
                host
            }
        }
    }
}

#[derive(Args)]
pub struct HostArgs {
    /// Host to provision, as `host` or `user@host`
    pub target: Target,
    /// SSH private key (defaults to the SSH agent)
    #[arg(short, long)]
    pub identity: Option<PathBuf>,
    /// Name the host advertises on the mesh
    #[arg(long)]
    pub hostname: Option<String>,
    /// SSH port
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Remote command that verifies the installed platform
    #[arg(long)]
    pub health_command: Option<String>,
    /// Local tailscale client used to find the host on the mesh
    #[arg(long, default_value = "tailscale")]
    pub tailscale: String,
}

impl HostArgs {
    pub fn target(&self) -> Target {
        let mut target: Target = self.target.clone();
        if let Some(hint) = &self.hostname {
            target = target.with_hostname_hint(hint);
        }
        if let Some(path) = &self.identity {
            target = target.with_credential(Credential::IdentityFile(path.clone()));
        }
        target
    }

    pub fn orchestrator(&self, config: DeployConfig) -> Orchestrator {
        let channel_config = ChannelConfig {
            ssh_port: self.port,
            ..ChannelConfig::default()
        };
        let orchestrator = Orchestrator::new(
            Box::new(SshChannel::new(&self.target(), channel_config)),
            Box::new(TailscaleDirectory::with_binary(&self.tailscale)),
            Box::new(TerminalOperator::default()),
            config,
        );
        match &self.health_command {
            Some(command) => orchestrator.with_health_command(command),
            None => orchestrator,
        }
    }
}

#[derive(Args)]
pub struct WatchArgs {
    /// The host will not join the mesh; never switch addresses
    #[arg(long)]
    pub no_mesh: bool,
    /// Give up on provisioning after this many seconds
    #[arg(short, long, default_value_t = 600)]
    pub timeout: u64,
    /// Seconds between status polls
    #[arg(long, default_value_t = 5)]
    pub poll_interval: u64,
}

impl WatchArgs {
    pub fn config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_secs(self.poll_interval),
            timeout: Duration::from_secs(self.timeout),
            mesh_enabled: !self.no_mesh,
            ..WatchConfig::default()
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
