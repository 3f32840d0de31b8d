//! Output of the mesh VPN client (`tailscale`).
//!
//! Two sources are understood:
//! * `tailscale ip -4` run on the provisioned host, which prints its own address.
//! * `tailscale status --json` run on the operator machine, which lists every peer.

use std::collections::HashMap;
use std::net::IpAddr;

use anyhow::Context;
use converge_common::network::address::is_mesh_ip;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DirectoryStatus {
    #[serde(rename = "Self")]
    pub self_node: Option<Peer>,
    #[serde(default)]
    pub peer: Option<HashMap<String, Peer>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Peer {
    #[serde(default)]
    pub host_name: String,
    #[serde(rename = "DNSName", default)]
    pub dns_name: String,
    #[serde(rename = "TailscaleIPs", default)]
    pub addresses: Option<Vec<IpAddr>>,
    #[serde(default)]
    pub online: bool,
}

impl Peer {
    fn is_named(&self, hint: &str) -> bool {
        let dns_label: &str = self.dns_name.split('.').next().unwrap_or_default();
        self.host_name.eq_ignore_ascii_case(hint) || dns_label.eq_ignore_ascii_case(hint)
    }

    /// Prefers IPv4, the family SSH configs and firewall rules are written for.
    fn preferred_address(&self) -> Option<IpAddr> {
        let addresses: &[IpAddr] = self.addresses.as_deref().unwrap_or_default();
        addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
    }
}

pub fn parse_directory(json: &str) -> anyhow::Result<DirectoryStatus> {
    serde_json::from_str(json).context("Failed to parse mesh directory status")
}

/// Finds the address of the peer advertising `hint` as its name.
///
/// Re-provisioned hosts can leave a stale offline node with the same name
/// behind, so online peers win.
pub fn find_peer(status: &DirectoryStatus, hint: &str) -> Option<IpAddr> {
    let mut candidates: Vec<&Peer> = status
        .peer
        .iter()
        .flat_map(|peers| peers.values())
        .filter(|peer| peer.is_named(hint))
        .collect();

    candidates.sort_by(|a, b| b.online.cmp(&a.online).then(a.dns_name.cmp(&b.dns_name)));
    debug!("{} mesh peers match '{hint}'", candidates.len());

    candidates.into_iter().find_map(Peer::preferred_address)
}

/// Parses `tailscale ip -4` output. Anything outside the mesh ranges is rejected.
pub fn parse_self_address(output: &str) -> Option<IpAddr> {
    output
        .lines()
        .filter_map(|line| line.trim().parse::<IpAddr>().ok())
        .find(is_mesh_ip)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
