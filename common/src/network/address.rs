//! The address remote commands are sent to, and where it lives.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use pnet::ipnetwork::{Ipv4Network, Ipv6Network};
use thiserror::Error;

/// Mesh VPN nodes are addressed out of the shared CGNAT block.
const MESH_V4_BASE: Ipv4Addr = Ipv4Addr::new(100, 64, 0, 0);
const MESH_V4_PREFIX: u8 = 10;
const MESH_V6_BASE: Ipv6Addr = Ipv6Addr::new(0xfd7a, 0x115c, 0xa1e0, 0, 0, 0, 0, 0);
const MESH_V6_PREFIX: u8 = 48;
const MESH_DNS_SUFFIX: &str = ".ts.net";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Public,
    Mesh,
}

impl AddressKind {
    pub fn classify(address: &str) -> Self {
        match address.parse::<IpAddr>() {
            Ok(ip) if is_mesh_ip(&ip) => AddressKind::Mesh,
            Ok(_) => AddressKind::Public,
            Err(_) if address.trim_end_matches('.').ends_with(MESH_DNS_SUFFIX) => {
                AddressKind::Mesh
            }
            Err(_) => AddressKind::Public,
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressKind::Public => write!(f, "public"),
            AddressKind::Mesh => write!(f, "mesh"),
        }
    }
}

pub fn is_mesh_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => Ipv4Network::new(MESH_V4_BASE, MESH_V4_PREFIX)
            .map(|net| net.contains(*v4))
            .unwrap_or(false),
        IpAddr::V6(v6) => Ipv6Network::new(MESH_V6_BASE, MESH_V6_PREFIX)
            .map(|net| net.contains(*v6))
            .unwrap_or(false),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("address already switched from {primary} to {current}")]
pub struct AlreadySwitched {
    pub primary: String,
    pub current: String,
}

/// The address currently used for remote commands.
///
/// Starts at the target's primary address and can be replaced exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAddress {
    primary: String,
    current: String,
    switched: bool,
}

impl ActiveAddress {
    pub fn new(primary: impl Into<String>) -> Self {
        let primary: String = primary.into();
        Self {
            current: primary.clone(),
            primary,
            switched: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.current
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn kind(&self) -> AddressKind {
        AddressKind::classify(&self.current)
    }

    pub fn is_switched(&self) -> bool {
        self.switched
    }

    pub fn adopt(&mut self, address: impl Into<String>) -> Result<(), AlreadySwitched> {
        if self.switched {
            return Err(AlreadySwitched {
                primary: self.primary.clone(),
                current: self.current.clone(),
            });
        }
        self.current = address.into();
        self.switched = true;
        Ok(())
    }
}

impl fmt::Display for ActiveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.current)
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
