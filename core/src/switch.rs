//! Moving a run from the public address onto the mesh.
//!
//! Provisioning usually tightens the firewall on the public interface after the
//! host has joined the mesh, so the address the run started on can stop
//! answering halfway through. The switch replaces it once and only once.

use std::net::IpAddr;

use converge_common::config::WatchConfig;
use converge_common::error::DeployError;
use converge_common::warn;
use tracing::debug;

use crate::resolver::AddressResolver;
use crate::retry::RetryPolicy;
use crate::session::Session;

const NO_HINT: &str = "<unknown>";

pub struct NetworkSwitch<'a> {
    resolver: AddressResolver<'a>,
    config: &'a WatchConfig,
}

impl<'a> NetworkSwitch<'a> {
    pub fn new(resolver: AddressResolver<'a>, config: &'a WatchConfig) -> Self {
        Self { resolver, config }
    }

    pub fn should_fire(&self, session: &Session) -> bool {
        self.config.mesh_enabled
            && !session.active.is_switched()
            && session.budget.consecutive() >= self.config.switch_threshold
    }

    /// Finds the mesh address and makes it the active one.
    ///
    /// On success the failure budget starts over. The cursor is untouched.
    pub async fn engage(&self, session: &mut Session) -> Result<IpAddr, DeployError> {
        let current: String = session.active.to_string();
        warn!(
            "{current} stopped answering after {} attempts, looking for its mesh address",
            session.budget.consecutive()
        );

        let found: IpAddr = match self.resolver.ask_host(&current).await {
            Some(ip) => ip,
            None => self.discover(session).await?,
        };

        session.active.adopt(found.to_string())?;
        session.budget.reset();
        debug!("active address is now {found}");
        Ok(found)
    }

    async fn discover(&self, session: &Session) -> Result<IpAddr, DeployError> {
        let Some(hint) = session.target.hostname_hint() else {
            return Err(DeployError::Discovery {
                hint: NO_HINT.to_string(),
                attempts: 0,
            });
        };

        let policy = RetryPolicy::new(self.config.discovery_wait, self.config.discovery_attempts);
        self.resolver
            .wait_for_peer(hint, policy)
            .await
            .map_err(|exhausted| DeployError::Discovery {
                hint: hint.to_string(),
                attempts: exhausted.attempts,
            })
    }
}
