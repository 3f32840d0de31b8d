//! Finding the addresses a host answers on.
//!
//! Two independent sources exist: the host itself, asked over the channel, and
//! the operator-local mesh directory. The second keeps working after the public
//! address has gone dark.

use std::net::IpAddr;

use converge_common::network::address::AddressKind;
use converge_common::network::target::Target;
use converge_protocols::mesh;
use tracing::debug;

use crate::channel::RemoteChannel;
use crate::commands;
use crate::directory::MeshDirectory;
use crate::retry::{Exhausted, RetryPolicy, poll_until};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub address: String,
    pub kind: AddressKind,
}

impl ResolvedAddress {
    fn new(address: impl Into<String>) -> Self {
        let address: String = address.into();
        Self {
            kind: AddressKind::classify(&address),
            address,
        }
    }
}

#[derive(Clone, Copy)]
pub struct AddressResolver<'a> {
    channel: &'a dyn RemoteChannel,
    directory: &'a dyn MeshDirectory,
}

impl<'a> AddressResolver<'a> {
    pub fn new(channel: &'a dyn RemoteChannel, directory: &'a dyn MeshDirectory) -> Self {
        Self { channel, directory }
    }

    /// Every address the target is known by, primary first, without duplicates.
    pub async fn resolve(&self, target: &Target) -> Vec<ResolvedAddress> {
        let mut found: Vec<ResolvedAddress> = vec![ResolvedAddress::new(&target.primary_address)];

        let mut push = |ip: IpAddr| {
            let candidate = ResolvedAddress::new(ip.to_string());
            if !found.contains(&candidate) {
                found.push(candidate);
            }
        };

        if let Some(ip) = self.ask_host(&target.primary_address).await {
            push(ip);
        }
        if let Some(hint) = target.hostname_hint() {
            if let Some(ip) = self.lookup_peer(hint).await {
                push(ip);
            }
        }

        found
    }

    /// Asks the host for its own mesh address. `None` when it cannot say.
    pub async fn ask_host(&self, address: &str) -> Option<IpAddr> {
        match self.channel.execute(address, commands::MESH_SELF_ADDRESS).await {
            Ok(output) if output.success() => mesh::parse_self_address(&output.stdout),
            Ok(output) => {
                debug!("{address} has no mesh address yet (exit {})", output.exit_code);
                None
            }
            Err(e) => {
                debug!("cannot ask {address} for its mesh address: {e}");
                None
            }
        }
    }

    /// One directory query. Directory failures count as "not found".
    pub async fn lookup_peer(&self, hint: &str) -> Option<IpAddr> {
        match self.directory.find_peer_address(hint).await {
            Ok(found) => found,
            Err(e) => {
                debug!("mesh directory query failed: {e:#}");
                None
            }
        }
    }

    /// Repeats [`Self::lookup_peer`] until the peer shows up.
    pub async fn wait_for_peer(&self, hint: &str, policy: RetryPolicy) -> Result<IpAddr, Exhausted> {
        poll_until(policy, move |attempt| async move {
            debug!("looking for mesh peer '{hint}' ({attempt}/{})", policy.max_attempts);
            self.lookup_peer(hint).await
        })
        .await
    }
}
