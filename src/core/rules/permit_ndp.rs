//! Permits the NDP messages IPv6 cannot function without
//!
//! Router solicitation, router advertisement and redirect are ICMPv6
//! exchanges with link-local scope; without them an IPv6 host cannot find
//! its router even while the tunnel is up.

use std::net::Ipv6Addr;

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder, TransportProtocol};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;
use crate::core::rules::{host_v6, link_local_v6};

const ROUTER_SOLICITATION: u8 = 133;
const ROUTER_ADVERTISEMENT: u8 = 134;
const REDIRECT: u8 = 137;

#[derive(Debug, Clone)]
pub struct PermitNdp {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_router_solicitation: Uuid,
    key_inbound_router_advertisement: Uuid,
    key_inbound_redirect: Uuid,
}

impl PermitNdp {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_outbound_router_solicitation: identity
                .filters
                .permit_ndp_outbound_router_solicitation,
            key_inbound_router_advertisement: identity
                .filters
                .permit_ndp_inbound_router_advertisement,
            key_inbound_redirect: identity.filters.permit_ndp_inbound_redirect,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![
            self.key_outbound_router_solicitation,
            self.key_inbound_router_advertisement,
            self.key_inbound_redirect,
        ]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        // All-routers link-local multicast group.
        let router_multicast = host_v6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x2));

        //
        // #1 permit outbound router solicitation
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_router_solicitation)
            .name("Permit outbound NDP router solicitation")
            .description("Part of a rule that permits NDP router discovery")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV6)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::Protocol(TransportProtocol::IcmpV6))?
            .add(Condition::IcmpType(ROUTER_SOLICITATION))?
            .add(Condition::IcmpCode(0))?
            .add(Condition::RemoteAddress(router_multicast))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 permit inbound router advertisement
        //

        let filter = filter
            .key(self.key_inbound_router_advertisement)
            .name("Permit inbound NDP router advertisement")
            .layer(FilterLayer::InboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV6)
            .add(Condition::Protocol(TransportProtocol::IcmpV6))?
            .add(Condition::IcmpType(ROUTER_ADVERTISEMENT))?
            .add(Condition::IcmpCode(0))?
            .add(Condition::RemoteAddress(link_local_v6()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #3 permit inbound redirect message
        //

        let filter = filter
            .key(self.key_inbound_redirect)
            .name("Permit inbound NDP redirect")
            .layer(FilterLayer::InboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV6)
            .add(Condition::Protocol(TransportProtocol::IcmpV6))?
            .add(Condition::IcmpType(REDIRECT))?
            .add(Condition::IcmpCode(0))?
            .add(Condition::RemoteAddress(link_local_v6()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
