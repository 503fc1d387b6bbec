//! Permits all loopback traffic, both directions, both address families

use uuid::Uuid;

use crate::core::condition::{Condition, ConditionBuilder};
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;

#[derive(Debug, Clone)]
pub struct PermitLoopback {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_v4: Uuid,
    key_inbound_v4: Uuid,
    key_outbound_v6: Uuid,
    key_inbound_v6: Uuid,
}

impl PermitLoopback {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_outbound_v4: identity.filters.permit_loopback_outbound_v4,
            key_inbound_v4: identity.filters.permit_loopback_inbound_v4,
            key_outbound_v6: identity.filters.permit_loopback_outbound_v6,
            key_inbound_v6: identity.filters.permit_loopback_inbound_v6,
        }
    }

    pub fn keys(&self) -> Vec<Uuid> {
        vec![
            self.key_outbound_v4,
            self.key_inbound_v4,
            self.key_outbound_v6,
            self.key_inbound_v6,
        ]
    }

    pub fn apply(&self, installer: &mut dyn FilterInstaller) -> Result<()> {
        //
        // #1 permit outbound connections, ipv4
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_v4)
            .name("Permit outbound on loopback (IPv4)")
            .description("Part of a rule that permits all loopback traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Max)
            .permit();

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::Loopback)?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #2 permit inbound connections, ipv4
        //

        let filter = filter
            .key(self.key_inbound_v4)
            .name("Permit inbound on loopback (IPv4)")
            .layer(FilterLayer::InboundV4);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV4)
            .add(Condition::Loopback)?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #3 permit outbound connections, ipv6
        //

        let filter = filter
            .key(self.key_outbound_v6)
            .name("Permit outbound on loopback (IPv6)")
            .layer(FilterLayer::OutboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::Loopback)?
            .build();

        installer.add_filter(&filter.build()?, &conditions)?;

        //
        // #4 permit inbound connections, ipv6
        //

        let filter = filter
            .key(self.key_inbound_v6)
            .name("Permit inbound on loopback (IPv6)")
            .layer(FilterLayer::InboundV6);

        let conditions = ConditionBuilder::new(FilterLayer::InboundV6)
            .add(Condition::Loopback)?
            .build();

        installer.add_filter(&filter.build()?, &conditions)
    }
}
