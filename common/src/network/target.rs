//! # Managed Host Model
//!
//! Defines the single host a run provisions.
//!
//! A target is given on the command line as:
//! * A bare host (e.g., `203.0.113.7`, `edge-01.example.net`).
//! * A host with a login user (e.g., `ubuntu@203.0.113.7`).

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Authentication material handed to the remote shell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Credential {
    /// Whatever the local SSH agent offers.
    #[default]
    Agent,
    /// A private key file passed with `-i`.
    IdentityFile(PathBuf),
}

/// The remote host under management. Immutable for the whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub primary_address: String,
    pub user: Option<String>,
    hostname_hint: Option<String>,
    pub credential: Credential,
}

impl FromStr for Target {
    type Err = String;

    /// Parses `host` or `user@host`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (user, host) = match s.split_once('@') {
            Some((user, host)) => (Some(user), host),
            None => (None, s),
        };

        if let Some(user) = user {
            validate_part(user, "user")?;
        }
        validate_part(host, "host")?;

        let host = host.trim_start_matches('[').trim_end_matches(']');

        Ok(Self {
            primary_address: host.to_string(),
            user: user.map(str::to_string),
            hostname_hint: None,
            credential: Credential::Agent,
        })
    }
}

impl Target {
    pub fn new(primary_address: impl Into<String>) -> Self {
        Self {
            primary_address: primary_address.into(),
            user: None,
            hostname_hint: None,
            credential: Credential::Agent,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_hostname_hint(mut self, hint: impl Into<String>) -> Self {
        self.hostname_hint = Some(hint.into());
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    /// Name the host is expected to advertise in the mesh directory.
    ///
    /// Falls back to the first label of the primary address when that address
    /// is a hostname. An IP literal carries no name, so there is no hint.
    pub fn hostname_hint(&self) -> Option<&str> {
        if let Some(hint) = self.hostname_hint.as_deref() {
            return Some(hint);
        }
        if self.primary_address.parse::<IpAddr>().is_ok() {
            return None;
        }
        self.primary_address.split('.').next().filter(|s| !s.is_empty())
    }

    /// `user@address` as understood by `ssh`, for any address of this target.
    pub fn destination(&self, address: &str) -> String {
        match &self.user {
            Some(user) => format!("{user}@{address}"),
            None => address.to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.destination(&self.primary_address))
    }
}

fn validate_part(part: &str, what: &str) -> Result<(), String> {
    if part.is_empty() {
        return Err(format!("{what} cannot be empty"));
    }
    if part.chars().any(|c| c.is_whitespace() || c == '@' || c == '\'') {
        return Err(format!("invalid {what}: {part}"));
    }
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
