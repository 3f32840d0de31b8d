//! The operator-local mesh membership directory.

use std::net::IpAddr;

use anyhow::{Context, ensure};
use async_trait::async_trait;
use converge_protocols::mesh;
use tokio::process::Command;
use tracing::debug;

/// Looks peers up by the name they advertise, independently of the target.
#[async_trait]
pub trait MeshDirectory: Send + Sync {
    async fn find_peer_address(&self, hostname_hint: &str) -> anyhow::Result<Option<IpAddr>>;
}

/// Asks the local `tailscale` client for its view of the tailnet.
pub struct TailscaleDirectory {
    binary: String,
}

impl TailscaleDirectory {
    /// `binary` is the client to run, `tailscale` when it is on the PATH.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MeshDirectory for TailscaleDirectory {
    async fn find_peer_address(&self, hostname_hint: &str) -> anyhow::Result<Option<IpAddr>> {
        let output = Command::new(&self.binary)
            .args(["status", "--json"])
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("running {} status --json", self.binary))?;

        ensure!(
            output.status.success(),
            "{} status failed: {}",
            self.binary,
            String::from_utf8_lossy(&output.stderr).trim()
        );

        let status = mesh::parse_directory(&String::from_utf8_lossy(&output.stdout))?;
        let found: Option<IpAddr> = mesh::find_peer(&status, hostname_hint);
        debug!("directory lookup for '{hostname_hint}': {found:?}");
        Ok(found)
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
