//! Permits locally-initiated traffic to private networks and local
//! multicast groups

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;
use crate::core::rules::{link_local_v6, network_v4, network_v6};

/// RFC 1918 private ranges plus the IPv4 link-local range
fn private_networks_v4() -> Vec<IpNetwork> {
    vec![
        network_v4(Ipv4Addr::new(10, 0, 0, 0), 8),
        network_v4(Ipv4Addr::new(172, 16, 0, 0), 12),
        network_v4(Ipv4Addr::new(192, 168, 0, 0), 16),
        network_v4(Ipv4Addr::new(169, 254, 0, 0), 16),
    ]
}

#[derive(Debug, Clone)]
pub struct PermitLan {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_v4: Uuid,
    key_outbound_multicast_v4: Uuid,
    key_outbound_v6: Uuid,
    key_outbound_multicast_v6: Uuid,
}

impl PermitLan {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_outbound_v4: identity.filters.permit_lan_outbound_v4,
            key_outbound_multicast_v4: identity.filters.permit_lan_outbound_multicast_v4,
            key_outbound_v6: identity.filters.permit_lan_outbound_v6,
            key_outbound_multicast_v6: identity.filters.permit_lan_outbound_multicast_v6,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![
            self.key_outbound_v4,
            self.key_outbound_multicast_v4,
            self.key_outbound_v6,
            self.key_outbound_multicast_v6,
        ]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        self.apply_ipv4(installer)?;
        self.apply_ipv6(installer)
    }

    fn apply_ipv4(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 locally-initiated traffic
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_v4)
            .name("Permit outbound LAN traffic (IPv4)")
            .description("Part of a rule that permits LAN traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::RemoteAddressIn(private_networks_v4()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 LAN to multicast
        //

        let filter = filter
            .key(self.key_outbound_multicast_v4)
            .name("Permit outbound LAN multicast traffic (IPv4)");

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::RemoteAddressIn(vec![
                // Local subnet multicast.
                network_v4(Ipv4Addr::new(224, 0, 0, 0), 24),
                // Simple Service Discovery Protocol (SSDP) address.
                network_v4(Ipv4Addr::new(239, 255, 255, 250), 32),
                // mDNS Service Discovery address.
                network_v4(Ipv4Addr::new(239, 255, 255, 251), 32),
            ]))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }

    fn apply_ipv6(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 locally-initiated traffic
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_v6)
            .name("Permit outbound LAN traffic (IPv6)")
            .description("Part of a rule that permits LAN traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV6)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::RemoteAddress(link_local_v6()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 LAN to multicast
        //

        let filter = filter
            .key(self.key_outbound_multicast_v6)
            .name("Permit outbound LAN multicast traffic (IPv6)");

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::RemoteAddressIn(vec![
                network_v6(Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0), 16),
                network_v6(Ipv6Addr::new(0xff05, 0, 0, 0, 0, 0, 0, 0), 16),
            ]))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
