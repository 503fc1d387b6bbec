//! Permits contacting the VPN relay itself
//!
//! The one hole in the blocked-by-default state that lets the tunnel be
//! established: a single outbound filter scoped to the relay's address,
//! port and transport protocol, on the layer matching the relay's address
//! family.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder, TransportProtocol};
use crate::core::error::{Error, Result};
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;

/// Transport protocols a relay endpoint can speak
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum RelayProtocol {
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(serialize = "udp")]
    Udp,
}

impl RelayProtocol {
    const fn transport(self) -> TransportProtocol {
        match self {
            RelayProtocol::Tcp => TransportProtocol::Tcp,
            RelayProtocol::Udp => TransportProtocol::Udp,
        }
    }
}

/// The relay endpoint a policy permits reaching
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayEndpoint {
    pub address: IpAddr,
    pub port: u16,
    pub protocol: RelayProtocol,
}

#[derive(Debug, Clone)]
pub struct PermitVpnRelay {
    provider: Uuid,
    sublayer: Uuid,
    key: Uuid,
    relay: RelayEndpoint,
}

impl PermitVpnRelay {
    pub fn new(identity: &IdentityConfig, relay: RelayEndpoint) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key: identity.filters.permit_vpn_relay,
            relay,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![self.key]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        let layer = match self.relay.address {
            IpAddr::V4(_) => FilterLayer::OutboundV4,
            IpAddr::V6(_) => FilterLayer::OutboundV6,
        };

        let filter = FilterBuilder::new()
            .key(self.key)
            .name("Permit outbound connections to VPN relay")
            .description("Part of a rule that permits communication with a VPN relay")
            .provider(self.provider)
            .layer(layer)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(layer)
            .add(Condition::Protocol(self.relay.protocol.transport()))?
            .add(Condition::RemoteAddress(IpNetwork::from(
                self.relay.address,
            )))?
            .add(Condition::RemotePort(self.relay.port))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}

// Keep the relay protocol enum honest against the transport selector: a
// relay can never be an ICMP endpoint.
impl TryFrom<TransportProtocol> for RelayProtocol {
    type Error = Error;

    fn try_from(protocol: TransportProtocol) -> Result<Self> {
        match protocol {
            TransportProtocol::Tcp => Ok(RelayProtocol::Tcp),
            TransportProtocol::Udp => Ok(RelayProtocol::Udp),
            TransportProtocol::IcmpV6 => Err(Error::Configuration(
                "a VPN relay endpoint must speak TCP or UDP".into(),
            )),
        }
    }
}
