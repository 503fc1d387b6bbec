//! Permits hosting services reachable from the local network

use std::net::Ipv4Addr;

use ipnetwork::IpNetwork;
use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;
use crate::core::rules::{link_local_v6, network_v4};

fn private_networks_v4() -> Vec<IpNetwork> {
    vec![
        network_v4(Ipv4Addr::new(10, 0, 0, 0), 8),
        network_v4(Ipv4Addr::new(172, 16, 0, 0), 12),
        network_v4(Ipv4Addr::new(192, 168, 0, 0), 16),
        network_v4(Ipv4Addr::new(169, 254, 0, 0), 16),
    ]
}

#[derive(Debug, Clone)]
pub struct PermitLanService {
    provider: Uuid,
    sublayer: Uuid,
    key_inbound_v4: Uuid,
    key_inbound_v6: Uuid,
}

impl PermitLanService {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_inbound_v4: identity.filters.permit_lan_service_inbound_v4,
            key_inbound_v6: identity.filters.permit_lan_service_inbound_v6,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![self.key_inbound_v4, self.key_inbound_v6]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 incoming request, ipv4
        //

        let filter = FilterBuilder::new()
            .key(self.key_inbound_v4)
            .name("Permit inbound LAN traffic (IPv4)")
            .description("Part of a rule that permits hosting services in a LAN environment")
            .provider(self.provider)
            .layer(FilterLayer::InboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::InboundV4)
            .add(Condition::RemoteAddressIn(private_networks_v4()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 incoming request, ipv6
        //

        let filter = filter
            .key(self.key_inbound_v6)
            .name("Permit inbound LAN traffic (IPv6)")
            .layer(FilterLayer::InboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV6)
            .add(Condition::RemoteAddress(link_local_v6()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
