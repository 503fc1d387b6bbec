//! Permits this host to answer DHCPv4 requests from clients on the local
//! network
//!
//! DHCP is a fixed-port exchange between server port 67 and client port
//! 68. The engine evaluates inbound and outbound independently, so the
//! incoming request and the outgoing response each need their own filter.

use std::net::Ipv4Addr;

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder, TransportProtocol};
use crate::core::error::{Error, Result};
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;
use crate::core::rules::{Extent, host_v4};

const DHCPV4_SERVER_PORT: u16 = 67;
const DHCPV4_CLIENT_PORT: u16 = 68;

#[derive(Debug, Clone)]
pub struct PermitDhcpServer {
    provider: Uuid,
    sublayer: Uuid,
    key_inbound_request_v4: Uuid,
    key_outbound_response_v4: Uuid,
}

impl PermitDhcpServer {
    /// Creates the rule for the requested extent
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for any extent other than
    /// [`Extent::Ipv4Only`] - serving DHCPv6 is not implemented, and the
    /// unsupported request must fail here rather than at apply time.
    pub fn with_extent(extent: Extent, identity: &IdentityConfig) -> Result<Self> {
        if extent != Extent::Ipv4Only {
            return Err(Error::Configuration(format!(
                "permit-dhcp-server only supports the ipv4-only extent, got '{extent}'"
            )));
        }

        Ok(Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_inbound_request_v4: identity.filters.permit_dhcp_server_inbound_request_v4,
            key_outbound_response_v4: identity.filters.permit_dhcp_server_outbound_response_v4,
        })
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![self.key_inbound_request_v4, self.key_outbound_response_v4]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 permit incoming DHCPv4 request
        //
        // Clients discover servers by broadcasting, so the local address
        // of the request is the broadcast address.
        //

        let filter = FilterBuilder::new()
            .key(self.key_inbound_request_v4)
            .name("Permit inbound DHCP request (IPv4)")
            .description("Part of a rule that permits DHCP server traffic")
            .provider(self.provider)
            .layer(FilterLayer::InboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::InboundV4)
            .add(Condition::Protocol(TransportProtocol::Udp))?
            .add(Condition::LocalPort(DHCPV4_SERVER_PORT))?
            .add(Condition::LocalAddress(host_v4(Ipv4Addr::BROADCAST)))?
            .add(Condition::RemotePort(DHCPV4_CLIENT_PORT))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 permit outbound DHCPv4 response
        //

        let filter = filter
            .key(self.key_outbound_response_v4)
            .name("Permit outbound DHCP response (IPv4)")
            .layer(FilterLayer::OutboundV4);

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::Protocol(TransportProtocol::Udp))?
            .add(Condition::LocalPort(DHCPV4_SERVER_PORT))?
            .add(Condition::RemotePort(DHCPV4_CLIENT_PORT))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
