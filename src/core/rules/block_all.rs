//! The default-deny baseline: block everything, both directions, both
//! address families
//!
//! Installed at minimum weight so that every permit exception in the same
//! sublayer outranks it. The condition sets are empty - an empty set
//! matches all traffic on its layer.

use uuid::Uuid;

use crate::core::condition::ConditionSet;
use crate::core::error::Result;
use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
use crate::core::identity::IdentityConfig;
use crate::core::install::FilterInstaller;

#[derive(Debug, Clone)]
pub struct BlockAll {
    provider: Uuid,
    sublayer: Uuid,
    key_outbound_v4: Uuid,
    key_inbound_v4: Uuid,
    key_outbound_v6: Uuid,
    key_inbound_v6: Uuid,
}

impl BlockAll {
    pub fn new(identity: &IdentityConfig) -> Self {
        Self {
            provider: identity.provider,
            sublayer: identity.sublayer_permit,
            key_outbound_v4: identity.filters.block_all_outbound_v4,
            key_inbound_v4: identity.filters.block_all_inbound_v4,
            key_outbound_v6: identity.filters.block_all_outbound_v6,
            key_inbound_v6: identity.filters.block_all_inbound_v6,
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
        // #1 block outbound connections, ipv4
        //

        let filter = FilterBuilder::new()
            .key(self.key_outbound_v4)
            .name("Block all outbound connections (IPv4)")
            .description("Part of a rule that restricts inbound and outbound traffic")
            .provider(self.provider)
            .layer(FilterLayer::OutboundV4)
            .sublayer(self.sublayer)
            .weight(WeightClass::Min)
            .block();

        installer.add_filter(
            &filter.build()?,
            &ConditionSet::match_all(FilterLayer::OutboundV4),
        )?;

        //
        // #2 block inbound connections, ipv4
        //

        let filter = filter
            .key(self.key_inbound_v4)
            .name("Block all inbound connections (IPv4)")
            .layer(FilterLayer::InboundV4);

        installer.add_filter(
            &filter.build()?,
            &ConditionSet::match_all(FilterLayer::InboundV4),
        )?;

        //
        // #3 block outbound connections, ipv6
        //

        let filter = filter
            .key(self.key_outbound_v6)
            .name("Block all outbound connections (IPv6)")
            .layer(FilterLayer::OutboundV6);

        installer.add_filter(
            &filter.build()?,
            &ConditionSet::match_all(FilterLayer::OutboundV6),
        )?;

        //
        // #4 block inbound connections, ipv6
        //

        let filter = filter
            .key(self.key_inbound_v6)
            .name("Block all inbound connections (IPv6)")
            .layer(FilterLayer::InboundV6);

        installer.add_filter(
            &filter.build()?,
            &ConditionSet::match_all(FilterLayer::InboundV6),
        )
    }
}
