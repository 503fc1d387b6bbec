//! Permits locally-initiated traffic inside the VPN tunnel

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;

#[derive(Debug, Clone)]
pub struct PermitVpnTunnel {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_v4: Uuid,
    key_outbound_v6: Uuid,
    tunnel_alias: String,
}

impl PermitVpnTunnel {
    pub fn new(identity: &IdentityConfig, tunnel_alias: impl Into<String>) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_outbound_v4: identity.filters.permit_vpn_tunnel_outbound_v4,
            key_outbound_v6: identity.filters.permit_vpn_tunnel_outbound_v6,
            tunnel_alias: tunnel_alias.into(),
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![self.key_outbound_v4, self.key_outbound_v6]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 permit locally-initiated traffic on tunnel interface, ipv4
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_v4)
            .name("Permit outbound on tunnel interface (IPv4)")
            .description("Part of a rule that permits communications inside the VPN tunnel")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::Interface(self.tunnel_alias.clone()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 permit locally-initiated traffic on tunnel interface, ipv6
        //

        let filter = filter
            .key(self.key_outbound_v6)
            .name("Permit outbound on tunnel interface (IPv6)")
            .layer(FilterLayer::OutboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::Interface(self.tunnel_alias.clone()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
