//! Named firewall states composed of ordered rules
//!
//! A [`Policy`] is one complete firewall state: an ordered collection of
//! rules applied together against one installer, inside one engine
//! transaction. The presets mirror the states the VPN lifecycle moves
//! through - connecting, connected and blocked - each built on the same
//! baseline of block-all plus loopback.
//!
//! Applying a policy is all-or-nothing from the caller's perspective. The
//! rules themselves are fail-fast and never compensate; discarding the
//! filters of a partially applied policy is the transaction contract of
//! [`TransactionalEngine`].

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{Error, Result};
use crate::core::identity::IdentityConfig;
use crate::core::install::{FilterInstaller, TransactionalEngine};
use crate::core::rules::{
    BlockAll, Extent, FirewallRule, PermitDhcp, PermitDhcpServer, PermitLan, PermitLanService,
    PermitLoopback, PermitNdp, PermitVpnRelay, PermitVpnTunnel, PermitVpnTunnelService,
    RelayEndpoint, RestrictDns,
};

/// Host-owner choices folded into every firewall state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySettings {
    /// Keep DHCP (and the NDP messages IPv6 needs) working while blocked
    #[serde(default)]
    pub permit_dhcp: bool,
    /// Keep the local network reachable, including hosting services on it
    #[serde(default)]
    pub permit_lan: bool,
}

/// One named firewall state
#[derive(Debug, Clone)]
pub struct Policy {
    name: String,
    rules: Vec<FirewallRule>,
}

impl Policy {
    /// Creates an empty policy
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Appends one rule; rules apply in insertion order
    pub fn push(&mut self, rule: impl Into<FirewallRule>) {
        self.rules.push(rule.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[FirewallRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks that no two rules declare the same filter identity key
    ///
    /// Duplicate keys are a modeling error: the second installation would
    /// silently supersede the first and the policy would under-block or
    /// over-permit without any failure surfacing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFilterKey`] naming the first duplicate.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for rule in &self.rules {
            for key in rule.keys() {
                if !seen.insert(key) {
                    return Err(Error::DuplicateFilterKey {
                        key,
                        policy: self.name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Applies every rule, in order, against an installer whose
    /// transaction the caller already holds open
    ///
    /// # Errors
    ///
    /// Returns the validation error or the first rule failure without
    /// applying any further rules. The caller must treat the enclosing
    /// transaction as failed.
    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        self.validate()?;

        info!(policy = %self.name, rules = self.rules.len(), "applying firewall policy");

        for rule in &self.rules {
            rule.apply(installer)?;
        }

        Ok(())
    }

    /// Applies the whole policy inside one engine transaction
    ///
    /// This is the atomicity boundary: per the [`TransactionalEngine`]
    /// contract, a failing rule leaves the engine exactly as it was.
    ///
    /// # Errors
    ///
    /// Propagates the first rule failure, after the engine has rolled the
    /// transaction back.
    pub fn apply_in_transaction(&self, engine: &mut dyn TransactionalEngine) -> Result<()> {
        engine.execute(&mut |installer| self.apply(installer))
    }

    /// State while the tunnel is being negotiated: everything blocked
    /// except loopback, the chosen settings exceptions, and the relay
    /// itself
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a settings rule rejects its
    /// parameters.
    pub fn connecting(
        identity: &IdentityConfig,
        settings: &PolicySettings,
        relay: RelayEndpoint,
    ) -> Result<Self> {
        let mut policy = Self::new("connecting");
        append_baseline(&mut policy, identity);
        append_settings_rules(&mut policy, identity, settings)?;
        policy.push(PermitVpnRelay::new(identity, relay));
        Ok(policy)
    }

    /// State once the tunnel is up: the connecting state plus traffic
    /// inside the tunnel, with DNS pinned to the tunnel resolver
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a settings rule rejects its
    /// parameters.
    pub fn connected(
        identity: &IdentityConfig,
        settings: &PolicySettings,
        relay: RelayEndpoint,
        tunnel_alias: &str,
        v4_resolver: Ipv4Addr,
        v6_resolver: Option<Ipv6Addr>,
    ) -> Result<Self> {
        let mut policy = Self::new("connected");
        append_baseline(&mut policy, identity);
        append_settings_rules(&mut policy, identity, settings)?;
        policy.push(PermitVpnRelay::new(identity, relay));
        policy.push(PermitVpnTunnel::new(identity, tunnel_alias));
        policy.push(PermitVpnTunnelService::new(identity, tunnel_alias));
        policy.push(RestrictDns::new(
            identity,
            tunnel_alias,
            v4_resolver,
            v6_resolver,
        ));
        Ok(policy)
    }

    /// State with no tunnel and no attempt to build one: everything
    /// blocked except loopback and the chosen settings exceptions
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a settings rule rejects its
    /// parameters.
    pub fn blocked(identity: &IdentityConfig, settings: &PolicySettings) -> Result<Self> {
        let mut policy = Self::new("blocked");
        append_baseline(&mut policy, identity);
        append_settings_rules(&mut policy, identity, settings)?;
        Ok(policy)
    }
}

/// Every state starts from deny-everything with loopback carved out
fn append_baseline(policy: &mut Policy, identity: &IdentityConfig) {
    policy.push(BlockAll::new(identity));
    policy.push(PermitLoopback::new(identity));
}

fn append_settings_rules(
    policy: &mut Policy,
    identity: &IdentityConfig,
    settings: &PolicySettings,
) -> Result<()> {
    if settings.permit_dhcp {
        policy.push(PermitDhcp::new(identity));
        policy.push(PermitNdp::new(identity));
    }

    if settings.permit_lan {
        policy.push(PermitLan::new(identity));
        policy.push(PermitLanService::new(identity));
        policy.push(PermitDhcpServer::with_extent(Extent::Ipv4Only, identity)?);
    }

    Ok(())
}
