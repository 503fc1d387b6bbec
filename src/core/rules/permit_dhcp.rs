//! Permits this host's own DHCP client exchanges, IPv4 and IPv6
//!
//! The engine maps the first UDP packet of a unique remote address/port
//! tuple to the outbound-connect layer and replies to the inbound-accept
//! layer, so the request and response directions each get a filter per
//! address family.

use std::net::{Ipv4Addr, Ipv6Addr};

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder, TransportProtocol};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;
use crate::core::rules::{host_v4, host_v6, link_local_v6};

const DHCPV4_CLIENT_PORT: u16 = 68;
const DHCPV4_SERVER_PORT: u16 = 67;
const DHCPV6_CLIENT_PORT: u16 = 546;
const DHCPV6_SERVER_PORT: u16 = 547;

#[derive(Debug, Clone)]
pub struct PermitDhcp {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_request_v4: Uuid,
    key_inbound_response_v4: Uuid,
    key_outbound_request_v6: Uuid,
    key_inbound_response_v6: Uuid,
}

impl PermitDhcp {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_outbound_request_v4: identity.filters.permit_dhcp_outbound_request_v4,
            key_inbound_response_v4: identity.filters.permit_dhcp_inbound_response_v4,
            key_outbound_request_v6: identity.filters.permit_dhcp_outbound_request_v6,
            key_inbound_response_v6: identity.filters.permit_dhcp_inbound_response_v6,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![
            self.key_outbound_request_v4,
            self.key_inbound_response_v4,
            self.key_outbound_request_v6,
            self.key_inbound_response_v6,
        ]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        self.apply_ipv4(installer)?;
        self.apply_ipv6(installer)
    }

    fn apply_ipv4(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 permit outbound DHCPv4 request
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_request_v4)
            .name("Permit outbound DHCP request (IPv4)")
            .description("Part of a rule that permits DHCP client traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::Protocol(TransportProtocol::Udp))?
            .add(Condition::LocalPort(DHCPV4_CLIENT_PORT))?
            .add(Condition::RemoteAddress(host_v4(Ipv4Addr::BROADCAST)))?
            .add(Condition::RemotePort(DHCPV4_SERVER_PORT))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 permit inbound DHCPv4 response
        //

        let filter = filter
            .key(self.key_inbound_response_v4)
            .name("Permit inbound DHCP response (IPv4)")
            .layer(FilterLayer::InboundV4);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV4)
            .add(Condition::Protocol(TransportProtocol::Udp))?
            .add(Condition::LocalPort(DHCPV4_CLIENT_PORT))?
            .add(Condition::RemotePort(DHCPV4_SERVER_PORT))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }

    fn apply_ipv6(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        // DHCPv6 servers are reached through the well-known link-local and
        // site-local multicast groups.
        let link_local_multicast = host_v6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0x1, 0x2));
        let site_local_multicast = host_v6(Ipv6Addr::new(0xff05, 0, 0, 0, 0, 0, 0x1, 0x3));

        //
        // #1 permit outbound DHCPv6 request
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_request_v6)
            .name("Permit outbound DHCP request (IPv6)")
            .description("Part of a rule that permits DHCP client traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV6)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::Protocol(TransportProtocol::Udp))?
            .add(Condition::LocalAddress(link_local_v6()))?
            .add(Condition::LocalPort(DHCPV6_CLIENT_PORT))?
            .add(Condition::RemoteAddressIn(vec![
                link_local_multicast,
                site_local_multicast,
            ]))?
            .add(Condition::RemotePort(DHCPV6_SERVER_PORT))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 permit inbound DHCPv6 response
        //

        let filter = filter
            .key(self.key_inbound_response_v6)
            .name("Permit inbound DHCP response (IPv6)")
            .layer(FilterLayer::InboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV6)
            .add(Condition::Protocol(TransportProtocol::Udp))?
            .add(Condition::LocalAddress(link_local_v6()))?
            .add(Condition::LocalPort(DHCPV6_CLIENT_PORT))?
            .add(Condition::RemoteAddress(link_local_v6()))?
            .add(Condition::RemotePort(DHCPV6_SERVER_PORT))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
