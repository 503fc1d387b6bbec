//! Restricts DNS to the tunnel and the configured resolver
//!
//! Two blocking filters per address family: one kills DNS that leaves on
//! any interface other than the tunnel, the other kills DNS inside the
//! tunnel that is not aimed at the configured resolver. Only effective on
//! top of the block-all baseline and the tunnel permit; installed in the
//! block sublayer so no permit exception can shadow it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;

const DNS_PORT: u16 = 53;

#[derive(Debug, Clone)]
pub struct RestrictDns {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_v4: Uuid,
    key_outbound_tunnel_v4: Uuid,
    key_outbound_v6: Uuid,
    key_outbound_tunnel_v6: Uuid,
    tunnel_alias: String,
    v4_resolver: Ipv4Addr,
    v6_resolver: Option<Ipv6Addr>,
}

impl RestrictDns {
    pub fn new(
        identity: &IdentityConfig,
        tunnel_alias: impl Into<String>,
        v4_resolver: Ipv4Addr,
        v6_resolver: Option<Ipv6Addr>,
    ) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_block,
            key_outbound_v4: identity.filters.restrict_dns_outbound_v4,
            key_outbound_tunnel_v4: identity.filters.restrict_dns_outbound_tunnel_v4,
            key_outbound_v6: identity.filters.restrict_dns_outbound_v6,
            key_outbound_tunnel_v6: identity.filters.restrict_dns_outbound_tunnel_v6,
            tunnel_alias: tunnel_alias.into(),
            v4_resolver,
            v6_resolver,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![
            self.key_outbound_v4,
            self.key_outbound_tunnel_v4,
            self.key_outbound_v6,
            self.key_outbound_tunnel_v6,
        ]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 block DNS leaving outside the tunnel, ipv4
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_v4)
            .name("Block DNS requests outside the VPN tunnel (IPv4)")
            .description("Part of a rule that restricts DNS traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .block();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::RemotePort(DNS_PORT))?
            .add(Condition::InterfaceNot(self.tunnel_alias.clone()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 block DNS inside the tunnel aimed anywhere but the resolver, ipv4
        //

        let filter = filter
            .key(self.key_outbound_tunnel_v4)
            .name("Restrict DNS requests inside the VPN tunnel (IPv4)")
            .layer(FilterLayer::OutboundV4);

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::RemotePort(DNS_PORT))?
            .add(Condition::RemoteAddressNot(IpAddr::V4(self.v4_resolver)))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #3 block DNS leaving outside the tunnel, ipv6
        //

        let filter = filter
            .key(self.key_outbound_v6)
            .name("Block DNS requests outside the VPN tunnel (IPv6)")
            .layer(FilterLayer::OutboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::RemotePort(DNS_PORT))?
            .add(Condition::InterfaceNot(self.tunnel_alias.clone()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #4 block DNS inside the tunnel aimed anywhere but the resolver, ipv6
        //
        // Without a configured IPv6 resolver this blocks all DNS inside
        // the tunnel on IPv6.
        //

        let filter = filter
            .key(self.key_outbound_tunnel_v6)
            .name("Restrict DNS requests inside the VPN tunnel (IPv6)")
            .layer(FilterLayer::OutboundV6);

        let mut conditions =
            ConditionBuilder::new(FilterLayer::OutboundV6).add(Condition::RemotePort(DNS_PORT))?;

        if let Some(resolver) = self.v6_resolver {
            conditions = conditions.add(Condition::RemoteAddressNot(IpAddr::V6(resolver)))?;
        }

        installer.add_filter(&filter.build()?, &conditions.build())
    }
}
