//! Stable identity keys for every object this engine installs
//!
//! The filter engine identifies providers, sublayers and filters by GUID.
//! These keys must never change meaning across versions: reinstalling a
//! filter under its key supersedes the previous instance, and uninstall
//! tooling enumerates the full registry to remove everything the engine
//! ever owned.
//!
//! The table is an externally supplied configuration value. Rules receive
//! it by reference at construction instead of reading ambient global state,
//! which keeps every key a deployment could need to override in one place.
//! [`IdentityConfig::default`] carries the well-known keys; a deployment
//! can load replacements from a JSON file via [`IdentityConfig::load`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::{Uuid, uuid};

use crate::core::error::Result;

/// Identity of the software component owning all installed filters
pub const PROVIDER: Uuid = uuid!("7a44f8c6-2d91-4c10-9d2e-50cc3f8b61a4");

/// Sublayer grouping the permit exceptions
pub const SUBLAYER_PERMIT: Uuid = uuid!("e3c80a9f-5b17-4d4e-8c5a-1f9d2b60c7e1");

/// Sublayer grouping the blocking rules
pub const SUBLAYER_BLOCK: Uuid = uuid!("4b6f20d3-9a8e-47b5-b1c0-7e52a94d30f6");

/// Complete identity table handed to rule constructors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IdentityConfig {
    pub provider: Uuid,
    pub sublayer_permit: Uuid,
    pub sublayer_block: Uuid,
    pub filters: FilterKeys,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider: PROVIDER,
            sublayer_permit: SUBLAYER_PERMIT,
            sublayer_block: SUBLAYER_BLOCK,
            filters: FilterKeys::default(),
        }
    }
}

impl IdentityConfig {
    /// Loads an identity table from a JSON file; missing fields keep
    /// their well-known defaults
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Enumerates every filter key in the table, for diagnostics and
    /// bulk removal by uninstall tooling
    pub fn all_filter_keys(&self) -> Vec<Uuid> {
        let f = &self.filters;
        vec![
            f.block_all_outbound_v4,
            f.block_all_inbound_v4,
            f.block_all_outbound_v6,
            f.block_all_inbound_v6,
            f.permit_loopback_outbound_v4,
            f.permit_loopback_inbound_v4,
            f.permit_loopback_outbound_v6,
            f.permit_loopback_inbound_v6,
            f.permit_dhcp_outbound_request_v4,
            f.permit_dhcp_inbound_response_v4,
            f.permit_dhcp_outbound_request_v6,
            f.permit_dhcp_inbound_response_v6,
            f.permit_dhcp_server_inbound_request_v4,
            f.permit_dhcp_server_outbound_response_v4,
            f.permit_lan_outbound_v4,
            f.permit_lan_outbound_multicast_v4,
            f.permit_lan_outbound_v6,
            f.permit_lan_outbound_multicast_v6,
            f.permit_lan_service_inbound_v4,
            f.permit_lan_service_inbound_v6,
            f.permit_ndp_outbound_router_solicitation,
            f.permit_ndp_inbound_router_advertisement,
            f.permit_ndp_inbound_redirect,
            f.permit_vpn_relay,
            f.permit_vpn_tunnel_outbound_v4,
            f.permit_vpn_tunnel_outbound_v6,
            f.permit_vpn_tunnel_service_inbound_v4,
            f.permit_vpn_tunnel_service_inbound_v6,
            f.restrict_dns_outbound_v4,
            f.restrict_dns_outbound_tunnel_v4,
            f.restrict_dns_outbound_v6,
            f.restrict_dns_outbound_tunnel_v6,
        ]
    }
}

/// One stable key per filter the engine can install
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FilterKeys {
    pub block_all_outbound_v4: Uuid,
    pub block_all_inbound_v4: Uuid,
    pub block_all_outbound_v6: Uuid,
    pub block_all_inbound_v6: Uuid,
    pub permit_loopback_outbound_v4: Uuid,
    pub permit_loopback_inbound_v4: Uuid,
    pub permit_loopback_outbound_v6: Uuid,
    pub permit_loopback_inbound_v6: Uuid,
    pub permit_dhcp_outbound_request_v4: Uuid,
    pub permit_dhcp_inbound_response_v4: Uuid,
    pub permit_dhcp_outbound_request_v6: Uuid,
    pub permit_dhcp_inbound_response_v6: Uuid,
    pub permit_dhcp_server_inbound_request_v4: Uuid,
    pub permit_dhcp_server_outbound_response_v4: Uuid,
    pub permit_lan_outbound_v4: Uuid,
    pub permit_lan_outbound_multicast_v4: Uuid,
    pub permit_lan_outbound_v6: Uuid,
    pub permit_lan_outbound_multicast_v6: Uuid,
    pub permit_lan_service_inbound_v4: Uuid,
    pub permit_lan_service_inbound_v6: Uuid,
    pub permit_ndp_outbound_router_solicitation: Uuid,
    pub permit_ndp_inbound_router_advertisement: Uuid,
    pub permit_ndp_inbound_redirect: Uuid,
    pub permit_vpn_relay: Uuid,
    pub permit_vpn_tunnel_outbound_v4: Uuid,
    pub permit_vpn_tunnel_outbound_v6: Uuid,
    pub permit_vpn_tunnel_service_inbound_v4: Uuid,
    pub permit_vpn_tunnel_service_inbound_v6: Uuid,
    pub restrict_dns_outbound_v4: Uuid,
    pub restrict_dns_outbound_tunnel_v4: Uuid,
    pub restrict_dns_outbound_v6: Uuid,
    pub restrict_dns_outbound_tunnel_v6: Uuid,
}

impl Default for FilterKeys {
    fn default() -> Self {
        Self {
            block_all_outbound_v4: uuid!("0c52a7b1-8f6d-4e03-9a41-d27e85c1f309"),
            block_all_inbound_v4: uuid!("6e1d93f5-0b7a-4c88-a2d6-3914c0e7b52d"),
            block_all_outbound_v6: uuid!("f49b0a26-7c3e-45d1-8e90-b65a2d14c783"),
            block_all_inbound_v6: uuid!("2a85d6c0-134f-49be-ba77-08f3e6a92d15"),
            permit_loopback_outbound_v4: uuid!("9d30b84e-a6f2-4b59-8107-c5d2ef6a4938"),
            permit_loopback_inbound_v4: uuid!("51c7e2a9-d40b-483f-92e8-6ab09f37d514"),
            permit_loopback_outbound_v6: uuid!("b8064f5d-29c7-4a12-bd3a-e98105c4f672"),
            permit_loopback_inbound_v6: uuid!("3e92c1b7-56a0-4dfe-8f45-07da62b839c1"),
            permit_dhcp_outbound_request_v4: uuid!("c15f08a3-7e94-42d6-a5b8-f260d3c1e947"),
            permit_dhcp_inbound_response_v4: uuid!("78a3d5e1-4c0f-4b27-9638-1e5b0af4d2c6"),
            permit_dhcp_outbound_request_v6: uuid!("04e6b92c-f58a-4713-8d0e-a9c417f5260b"),
            permit_dhcp_inbound_response_v6: uuid!("ea29c740-63bd-4f85-b1f2-58d00c3a96e4"),
            permit_dhcp_server_inbound_request_v4: uuid!("1fb4680d-92ce-45a7-83b9-64f1d7e0a523"),
            permit_dhcp_server_outbound_response_v4: uuid!("a6d013f8-5be2-4c94-97a0-2c8e5b1f6d47"),
            permit_lan_outbound_v4: uuid!("5709eab4-31cf-4dd2-bc68-e0a95d2c71f8"),
            permit_lan_outbound_multicast_v4: uuid!("d3b86c29-07e5-4af1-9254-8f6c01b3e7da"),
            permit_lan_outbound_v6: uuid!("8c42f7d0-ba19-4e63-a08d-375e9c6f2b41"),
            permit_lan_outbound_multicast_v6: uuid!("60ad35e8-c9f4-40b7-8e12-d45a7b08c396"),
            permit_lan_service_inbound_v4: uuid!("be17d042-68a3-4c5f-b9d6-0132f8ea75c4"),
            permit_lan_service_inbound_v6: uuid!("47f0a9c5-d2e8-4361-85bf-9b60d41e2a73"),
            permit_ndp_outbound_router_solicitation: uuid!("92c5e1f6-0a48-4bd3-a791-56e8230dfb4c"),
            permit_ndp_inbound_router_advertisement: uuid!("0dff4b82-936a-4e15-bd04-c7a1f9625e38"),
            permit_ndp_inbound_redirect: uuid!("75b2d8a0-41ec-4937-9f56-e30c6a84d1b9"),
            permit_vpn_relay: uuid!("3a61c49e-85d7-4f20-bc38-09fe7b5a24d6"),
            permit_vpn_tunnel_outbound_v4: uuid!("cf08536b-e2a9-4671-9d84-b1c5d20e8f37"),
            permit_vpn_tunnel_outbound_v6: uuid!("1854afc2-d70e-4b96-8a23-65f4e9d1c7b0"),
            permit_vpn_tunnel_service_inbound_v4: uuid!("69e3b0d7-2f81-4ca5-91cb-d8467a05f3e2"),
            permit_vpn_tunnel_service_inbound_v6: uuid!("ac97142f-60b5-4d38-bfe6-3725c1d09a84"),
            restrict_dns_outbound_v4: uuid!("e2405c81-97af-463d-80b2-1dc6f5e39a07"),
            restrict_dns_outbound_tunnel_v4: uuid!("58d1f63a-04b9-4728-95ed-72a0c8b4e619"),
            restrict_dns_outbound_v6: uuid!("b0c92e57-d1f4-4a06-8391-46e75d0a2c8f"),
            restrict_dns_outbound_tunnel_v6: uuid!("7f3a81d4-6bc0-4953-ae27-095b3f6e81d2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_filter_keys_are_distinct() {
        let identity = IdentityConfig::default();
        let keys = identity.all_filter_keys();
        let unique: HashSet<Uuid> = keys.iter().copied().collect();

        assert_eq!(keys.len(), unique.len());
        assert!(!unique.contains(&identity.provider));
        assert!(!unique.contains(&identity.sublayer_permit));
        assert!(!unique.contains(&identity.sublayer_block));
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let parsed: IdentityConfig = serde_json::from_str(
            r#"{ "provider": "00000000-0000-0000-0000-000000000001" }"#,
        )
        .unwrap();

        assert_eq!(parsed.provider, Uuid::from_u128(1));
        assert_eq!(parsed.sublayer_permit, SUBLAYER_PERMIT);
        assert_eq!(parsed.filters, FilterKeys::default());
    }

    #[test]
    fn test_table_roundtrips_through_json() {
        let identity = IdentityConfig::default();
        let json = serde_json::to_string(&identity).unwrap();
        let parsed: IdentityConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(identity, parsed);
    }
}
