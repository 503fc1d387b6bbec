//! Named, parameterized units of firewall policy
//!
//! Each rule knows how to produce the descriptor and condition-set pairs
//! that realize one network-access intent - one pair per layer, direction
//! and address family it must cover - and submits them in a fixed order to
//! the installer it is given. Separate filters produced by one rule are
//! logically ORed; the conditions inside each filter are ANDed.
//!
//! The set of rule kinds is closed: [`FirewallRule`] enumerates them all
//! and dispatches exhaustively. A new intent becomes a new variant, never
//! an open-ended trait implementation, so the compiler flags every place
//! that must learn about it.
//!
//! Rules are fail-fast. The first rejected filter aborts the rule and the
//! enclosing policy application; filters already submitted are left for
//! the engine transaction to discard.

pub mod block_all;
pub mod permit_dhcp;
pub mod permit_dhcp_server;
pub mod permit_lan;
pub mod permit_lan_service;
pub mod permit_loopback;
pub mod permit_ndp;
pub mod permit_vpn_relay;
pub mod permit_vpn_tunnel;
pub mod permit_vpn_tunnel_service;
pub mod restrict_dns;

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use tracing::debug;
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::install::FilterInstaller;

pub use block_all::BlockAll;
pub use permit_dhcp::PermitDhcp;
pub use permit_dhcp_server::PermitDhcpServer;
pub use permit_lan::PermitLan;
pub use permit_lan_service::PermitLanService;
pub use permit_loopback::PermitLoopback;
pub use permit_ndp::PermitNdp;
pub use permit_vpn_relay::{PermitVpnRelay, RelayEndpoint, RelayProtocol};
pub use permit_vpn_tunnel::PermitVpnTunnel;
pub use permit_vpn_tunnel_service::PermitVpnTunnelService;
pub use restrict_dns::RestrictDns;

/// Address families a rule is asked to cover
///
/// Most rules fix their own coverage; a rule that is extent-parameterized
/// validates the requested extent at construction time and refuses the
/// ones it does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum Extent {
    #[strum(serialize = "all")]
    All,
    #[strum(serialize = "ipv4-only")]
    Ipv4Only,
    #[strum(serialize = "ipv6-only")]
    Ipv6Only,
}

/// Closed set of every rule kind the engine knows
#[derive(Debug, Clone)]
pub enum FirewallRule {
    BlockAll(BlockAll),
    PermitLoopback(PermitLoopback),
    PermitDhcp(PermitDhcp),
    PermitDhcpServer(PermitDhcpServer),
    PermitLan(PermitLan),
    PermitLanService(PermitLanService),
    PermitNdp(PermitNdp),
    PermitVpnRelay(PermitVpnRelay),
    PermitVpnTunnel(PermitVpnTunnel),
    PermitVpnTunnelService(PermitVpnTunnelService),
    RestrictDns(RestrictDns),
}

impl FirewallRule {
    /// Returns the rule kind name for diagnostics
    pub const fn name(&self) -> &'static str {
        match self {
            FirewallRule::BlockAll(_) => "block-all",
            FirewallRule::PermitLoopback(_) => "permit-loopback",
            FirewallRule::PermitDhcp(_) => "permit-dhcp",
            FirewallRule::PermitDhcpServer(_) => "permit-dhcp-server",
            FirewallRule::PermitLan(_) => "permit-lan",
            FirewallRule::PermitLanService(_) => "permit-lan-service",
            FirewallRule::PermitNdp(_) => "permit-ndp",
            FirewallRule::PermitVpnRelay(_) => "permit-vpn-relay",
            FirewallRule::PermitVpnTunnel(_) => "permit-vpn-tunnel",
            FirewallRule::PermitVpnTunnelService(_) => "permit-vpn-tunnel-service",
            FirewallRule::RestrictDns(_) => "restrict-dns",
        }
    }

    /// Returns the identity keys of every filter this rule installs
    pub fn keys(&self) -> Vec<Uuid> {
        match self {
            FirewallRule::BlockAll(rule) => rule.keys(),
            FirewallRule::PermitLoopback(rule) => rule.keys(),
            FirewallRule::PermitDhcp(rule) => rule.keys(),
            FirewallRule::PermitDhcpServer(rule) => rule.keys(),
            FirewallRule::PermitLan(rule) => rule.keys(),
            FirewallRule::PermitLanService(rule) => rule.keys(),
            FirewallRule::PermitNdp(rule) => rule.keys(),
            FirewallRule::PermitVpnRelay(rule) => rule.keys(),
            FirewallRule::PermitVpnTunnel(rule) => rule.keys(),
            FirewallRule::PermitVpnTunnelService(rule) => rule.keys(),
            FirewallRule::RestrictDns(rule) => rule.keys(),
        }
    }

    /// Produces and submits this rule's filters, in order
    ///
    /// Safe to call any number of times: the same parameters always yield
    /// the same descriptor sequence, and the identity keys make repeated
    /// installation supersede rather than duplicate.
    ///
    /// # Errors
    ///
    /// Propagates the first installer rejection without submitting any
    /// further filters.
    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        debug!(rule = self.name(), "applying firewall rule");
        match self {
            FirewallRule::BlockAll(rule) => rule.apply(installer),
            FirewallRule::PermitLoopback(rule) => rule.apply(installer),
            FirewallRule::PermitDhcp(rule) => rule.apply(installer),
            FirewallRule::PermitDhcpServer(rule) => rule.apply(installer),
            FirewallRule::PermitLan(rule) => rule.apply(installer),
            FirewallRule::PermitLanService(rule) => rule.apply(installer),
            FirewallRule::PermitNdp(rule) => rule.apply(installer),
            FirewallRule::PermitVpnRelay(rule) => rule.apply(installer),
            FirewallRule::PermitVpnTunnel(rule) => rule.apply(installer),
            FirewallRule::PermitVpnTunnelService(rule) => rule.apply(installer),
            FirewallRule::RestrictDns(rule) => rule.apply(installer),
        }
    }
}

macro_rules! impl_from_rule {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for FirewallRule {
                fn from(rule: $variant) -> Self {
                    FirewallRule::$variant(rule)
                }
            }
        )+
    };
}

impl_from_rule!(
    BlockAll,
    PermitLoopback,
    PermitDhcp,
    PermitDhcpServer,
    PermitLan,
    PermitLanService,
    PermitNdp,
    PermitVpnRelay,
    PermitVpnTunnel,
    PermitVpnTunnelService,
    RestrictDns,
);

// Hard-coded networks below have known-valid prefixes.

pub(crate) fn network_v4(address: Ipv4Addr, prefix: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(address, prefix).expect("valid hard-coded network"))
}

pub(crate) fn network_v6(address: Ipv6Addr, prefix: u8) -> IpNetwork {
    IpNetwork::V6(Ipv6Network::new(address, prefix).expect("valid hard-coded network"))
}

pub(crate) fn host_v4(address: Ipv4Addr) -> IpNetwork {
    IpNetwork::from(IpAddr::V4(address))
}

pub(crate) fn host_v6(address: Ipv6Addr) -> IpNetwork {
    IpNetwork::from(IpAddr::V6(address))
}

/// fe80::/10, the IPv6 link-local range
pub(crate) fn link_local_v6() -> IpNetwork {
    network_v6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0), 10)
}
