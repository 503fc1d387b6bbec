//! Permits hosting services that listen on the tunnel interface

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;

#[derive(Debug, Clone)]
pub struct PermitVpnTunnelService {
    provider: Uuid,
    sublayer: Uuid,
    key_inbound_v4: Uuid,
    key_inbound_v6: Uuid,
    tunnel_alias: String,
}

impl PermitVpnTunnelService {
    pub fn new(identity: &IdentityConfig, tunnel_alias: impl Into<String>) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_inbound_v4: identity.filters.permit_vpn_tunnel_service_inbound_v4,
            key_inbound_v6: identity.filters.permit_vpn_tunnel_service_inbound_v6,
            tunnel_alias: tunnel_alias.into(),
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![self.key_inbound_v4, self.key_inbound_v6]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 incoming request on ipv4
        //

        let filter = FilterBuilder::new()
            .key(self.key_inbound_v4)
            .name("Permit inbound on tunnel interface (IPv4)")
            .description(
                "Part of a rule that permits hosting services that listen on the tunnel interface",
            )
            .provider(self.provider)
            .layer(FilterLayer::InboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::InboundV4)
            .add(Condition::Interface(self.tunnel_alias.clone()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 incoming request on ipv6
        //

        let filter = filter
            .key(self.key_inbound_v6)
            .name("Permit inbound on tunnel interface (IPv6)")
            .layer(FilterLayer::InboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV6)
            .add(Condition::Interface(self.tunnel_alias.clone()))?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
