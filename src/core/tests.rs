#[cfg(test)]
mod rule_tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::core::condition::{Condition, TransportProtocol};
    use crate::core::error::Error;
    use crate::core::filter::{Action, FilterLayer, WeightClass};
    use crate::core::identity::IdentityConfig;
    use crate::core::rules::{
        BlockAll, Extent, PermitDhcp, PermitDhcpServer, PermitLoopback, PermitNdp, PermitVpnRelay,
        RelayEndpoint, RelayProtocol, RestrictDns,
    };
    use crate::core::test_helpers::RecordingInstaller;

    fn identity() -> IdentityConfig {
        IdentityConfig::default()
    }

    #[test]
    fn test_dhcp_server_rejects_unsupported_extents() {
        let identity = identity();

        for extent in [Extent::All, Extent::Ipv6Only] {
            let result = PermitDhcpServer::with_extent(extent, &identity);
            assert!(matches!(result, Err(Error::Configuration(_))));
        }

        assert!(PermitDhcpServer::with_extent(Extent::Ipv4Only, &identity).is_ok());
    }

    #[test]
    fn test_dhcp_server_issues_two_filters_in_order() {
        let identity = identity();
        let rule = PermitDhcpServer::with_extent(Extent::Ipv4Only, &identity).unwrap();
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        assert_eq!(installer.calls(), 2);
        assert_eq!(
            installer.layers(),
            vec![FilterLayer::InboundV4, FilterLayer::OutboundV4]
        );

        let request = &installer.added[0];
        assert_eq!(
            request.descriptor.key,
            identity.filters.permit_dhcp_server_inbound_request_v4
        );
        assert_eq!(request.descriptor.action, Action::Permit);
        assert_eq!(request.descriptor.weight, WeightClass::Max);
        assert_eq!(
            request.descriptor.sublayer,
            Some(identity.sublayer_permit)
        );
        assert_eq!(
            request.conditions.conditions(),
            &[
                Condition::Protocol(TransportProtocol::Udp),
                Condition::LocalPort(67),
                Condition::LocalAddress("255.255.255.255/32".parse().unwrap()),
                Condition::RemotePort(68),
            ]
        );

        let response = &installer.added[1];
        assert_eq!(
            response.descriptor.key,
            identity.filters.permit_dhcp_server_outbound_response_v4
        );
        assert_eq!(
            response.conditions.conditions(),
            &[
                Condition::Protocol(TransportProtocol::Udp),
                Condition::LocalPort(67),
                Condition::RemotePort(68),
            ]
        );
    }

    #[test]
    fn test_loopback_issues_four_filters_in_order() {
        let identity = identity();
        let rule = PermitLoopback::new(&identity);
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        assert_eq!(installer.calls(), 4);
        assert_eq!(
            installer.layers(),
            vec![
                FilterLayer::OutboundV4,
                FilterLayer::InboundV4,
                FilterLayer::OutboundV6,
                FilterLayer::InboundV6,
            ]
        );

        for filter in &installer.added {
            assert_eq!(filter.descriptor.action, Action::Permit);
            assert_eq!(filter.descriptor.weight, WeightClass::Max);
            assert_eq!(filter.conditions.conditions(), &[Condition::Loopback]);
        }
    }

    #[test]
    fn test_block_all_is_minimum_weight_match_all() {
        let rule = BlockAll::new(&identity());
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        assert_eq!(installer.calls(), 4);
        assert_eq!(
            installer.layers(),
            vec![
                FilterLayer::OutboundV4,
                FilterLayer::InboundV4,
                FilterLayer::OutboundV6,
                FilterLayer::InboundV6,
            ]
        );

        for filter in &installer.added {
            assert_eq!(filter.descriptor.action, Action::Block);
            assert_eq!(filter.descriptor.weight, WeightClass::Min);
            assert!(filter.conditions.is_empty());
        }
    }

    #[test]
    fn test_dhcp_client_covers_both_families() {
        let rule = PermitDhcp::new(&identity());
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        assert_eq!(
            installer.layers(),
            vec![
                FilterLayer::OutboundV4,
                FilterLayer::InboundV4,
                FilterLayer::OutboundV6,
                FilterLayer::InboundV6,
            ]
        );

        // The v4 request goes to the broadcast address, the v6 request to
        // the two well-known DHCPv6 multicast groups.
        let v4_request = &installer.added[0];
        assert!(
            v4_request
                .conditions
                .conditions()
                .contains(&Condition::RemoteAddress(
                    "255.255.255.255/32".parse().unwrap()
                ))
        );

        let v6_request = &installer.added[2];
        assert!(
            v6_request
                .conditions
                .conditions()
                .contains(&Condition::RemoteAddressIn(vec![
                    "ff02::1:2/128".parse().unwrap(),
                    "ff05::1:3/128".parse().unwrap(),
                ]))
        );
    }

    #[test]
    fn test_ndp_filters_match_message_types() {
        let rule = PermitNdp::new(&identity());
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        assert_eq!(installer.calls(), 3);
        assert_eq!(
            installer.layers(),
            vec![
                FilterLayer::OutboundV6,
                FilterLayer::InboundV6,
                FilterLayer::InboundV6,
            ]
        );

        let types: Vec<u8> = installer
            .added
            .iter()
            .filter_map(|filter| {
                filter.conditions.conditions().iter().find_map(|c| match c {
                    Condition::IcmpType(t) => Some(*t),
                    _ => None,
                })
            })
            .collect();
        assert_eq!(types, vec![133, 134, 137]);
    }

    #[test]
    fn test_relay_layer_follows_address_family() {
        let identity = identity();

        let v4_relay = RelayEndpoint {
            address: IpAddr::V4(Ipv4Addr::new(185, 65, 132, 1)),
            port: 1300,
            protocol: RelayProtocol::Udp,
        };
        let mut installer = RecordingInstaller::new();
        PermitVpnRelay::new(&identity, v4_relay)
            .apply(&mut installer)
            .unwrap();
        assert_eq!(installer.layers(), vec![FilterLayer::OutboundV4]);
        assert_eq!(
            installer.added[0].conditions.conditions(),
            &[
                Condition::Protocol(TransportProtocol::Udp),
                Condition::RemoteAddress("185.65.132.1/32".parse().unwrap()),
                Condition::RemotePort(1300),
            ]
        );

        let v6_relay = RelayEndpoint {
            address: IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
            port: 443,
            protocol: RelayProtocol::Tcp,
        };
        let mut installer = RecordingInstaller::new();
        PermitVpnRelay::new(&identity, v6_relay)
            .apply(&mut installer)
            .unwrap();
        assert_eq!(installer.layers(), vec![FilterLayer::OutboundV6]);
    }

    #[test]
    fn test_relay_protocol_rejects_icmp() {
        let result = RelayProtocol::try_from(TransportProtocol::IcmpV6);
        assert!(matches!(result, Err(Error::Configuration(_))));

        assert_eq!(
            RelayProtocol::try_from(TransportProtocol::Udp).unwrap(),
            RelayProtocol::Udp
        );
    }

    #[test]
    fn test_restrict_dns_blocks_in_the_block_sublayer() {
        let identity = identity();
        let rule = RestrictDns::new(
            &identity,
            "wg0",
            Ipv4Addr::new(10, 64, 0, 1),
            Some(Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 1)),
        );
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        assert_eq!(installer.calls(), 4);

        for filter in &installer.added {
            assert_eq!(filter.descriptor.action, Action::Block);
            assert_eq!(filter.descriptor.sublayer, Some(identity.sublayer_block));
        }

        // Off-tunnel filters exclude the tunnel interface; in-tunnel
        // filters exclude the resolver address.
        assert!(
            installer.added[0]
                .conditions
                .conditions()
                .contains(&Condition::InterfaceNot("wg0".into()))
        );
        assert!(
            installer.added[1]
                .conditions
                .conditions()
                .contains(&Condition::RemoteAddressNot(IpAddr::V4(Ipv4Addr::new(
                    10, 64, 0, 1
                ))))
        );
    }

    #[test]
    fn test_restrict_dns_without_v6_resolver_blocks_all_tunnel_dns_v6() {
        let rule = RestrictDns::new(&identity(), "wg0", Ipv4Addr::new(10, 64, 0, 1), None);
        let mut installer = RecordingInstaller::new();

        rule.apply(&mut installer).unwrap();

        let tunnel_v6 = &installer.added[3];
        assert_eq!(
            tunnel_v6.conditions.conditions(),
            &[Condition::RemotePort(53)]
        );
    }

    #[test]
    fn test_rule_application_fails_fast() {
        let rule = PermitLoopback::new(&identity());
        let mut installer = RecordingInstaller::failing_on(2);

        let err = rule.apply(&mut installer).unwrap_err();

        assert!(matches!(err, Error::FilterRejected { .. }));
        // Exactly the rejected call happened, nothing beyond it.
        assert_eq!(installer.calls(), 2);
        assert_eq!(installer.added.len(), 1);
    }

    #[test]
    fn test_rule_application_is_deterministic() {
        let rule = PermitDhcp::new(&identity());

        let mut first = RecordingInstaller::new();
        rule.apply(&mut first).unwrap();

        let mut second = RecordingInstaller::new();
        rule.apply(&mut second).unwrap();

        assert_eq!(first.added, second.added);
    }
}

#[cfg(test)]
mod policy_tests {
    use std::net::{IpAddr, Ipv4Addr};

    use crate::core::error::Error;
    use crate::core::identity::IdentityConfig;
    use crate::core::install::TransactionalEngine;
    use crate::core::policy::{Policy, PolicySettings};
    use crate::core::rules::{PermitLoopback, RelayEndpoint, RelayProtocol};
    use crate::core::test_helpers::{MemoryEngine, RecordingInstaller};

    fn relay() -> RelayEndpoint {
        RelayEndpoint {
            address: IpAddr::V4(Ipv4Addr::new(185, 65, 132, 1)),
            port: 51820,
            protocol: RelayProtocol::Udp,
        }
    }

    fn all_settings() -> PolicySettings {
        PolicySettings {
            permit_dhcp: true,
            permit_lan: true,
        }
    }

    #[test]
    fn test_blocked_policy_composition() {
        let identity = IdentityConfig::default();
        let policy = Policy::blocked(&identity, &all_settings()).unwrap();

        let names: Vec<&str> = policy.rules().iter().map(|rule| rule.name()).collect();
        assert_eq!(
            names,
            vec![
                "block-all",
                "permit-loopback",
                "permit-dhcp",
                "permit-ndp",
                "permit-lan",
                "permit-lan-service",
                "permit-dhcp-server",
            ]
        );
    }

    #[test]
    fn test_connected_policy_appends_tunnel_rules() {
        let identity = IdentityConfig::default();
        let policy = Policy::connected(
            &identity,
            &PolicySettings::default(),
            relay(),
            "wg0",
            Ipv4Addr::new(10, 64, 0, 1),
            None,
        )
        .unwrap();

        let names: Vec<&str> = policy.rules().iter().map(|rule| rule.name()).collect();
        assert_eq!(
            names,
            vec![
                "block-all",
                "permit-loopback",
                "permit-vpn-relay",
                "permit-vpn-tunnel",
                "permit-vpn-tunnel-service",
                "restrict-dns",
            ]
        );
    }

    #[test]
    fn test_full_connected_policy_installs_every_known_filter() {
        let identity = IdentityConfig::default();
        let policy = Policy::connected(
            &identity,
            &all_settings(),
            relay(),
            "wg0",
            Ipv4Addr::new(10, 64, 0, 1),
            None,
        )
        .unwrap();

        let mut engine = MemoryEngine::new();
        policy.apply_in_transaction(&mut engine).unwrap();

        let mut installed: Vec<uuid::Uuid> = engine
            .installed
            .iter()
            .map(|filter| filter.descriptor.key)
            .collect();
        let mut known = identity.all_filter_keys();
        installed.sort();
        known.sort();

        assert_eq!(installed, known);
    }

    #[test]
    fn test_duplicate_keys_rejected_before_any_installer_call() {
        let identity = IdentityConfig::default();
        let mut policy = Policy::new("broken");
        policy.push(PermitLoopback::new(&identity));
        policy.push(PermitLoopback::new(&identity));

        let mut installer = RecordingInstaller::new();
        let err = policy.apply(&mut installer).unwrap_err();

        assert!(matches!(err, Error::DuplicateFilterKey { .. }));
        assert_eq!(installer.calls(), 0);
    }

    #[test]
    fn test_failed_transaction_installs_nothing() {
        let mut engine = MemoryEngine::new();

        let err = engine
            .execute(&mut |installer| {
                let identity = IdentityConfig::default();
                PermitLoopback::new(&identity).apply(installer)?;
                Err(Error::Configuration("forced failure".into()))
            })
            .unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert!(engine.installed.is_empty());
        assert_eq!(engine.committed_transactions, 0);
    }

    #[test]
    fn test_reapplying_a_policy_supersedes_instead_of_duplicating() {
        let identity = IdentityConfig::default();
        let policy = Policy::blocked(&identity, &all_settings()).unwrap();

        let mut engine = MemoryEngine::new();
        policy.apply_in_transaction(&mut engine).unwrap();
        let first_count = engine.installed.len();

        policy.apply_in_transaction(&mut engine).unwrap();

        assert_eq!(engine.installed.len(), first_count);
        assert_eq!(engine.committed_transactions, 2);
    }

    #[test]
    fn test_policy_preset_names() {
        let identity = IdentityConfig::default();
        let settings = PolicySettings::default();

        assert_eq!(
            Policy::connecting(&identity, &settings, relay())
                .unwrap()
                .name(),
            "connecting"
        );
        assert_eq!(Policy::blocked(&identity, &settings).unwrap().name(), "blocked");
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use crate::core::condition::{Condition, ConditionBuilder};
    use crate::core::filter::{FilterBuilder, FilterLayer, WeightClass};
    use ipnetwork::IpNetwork;
    use std::net::{IpAddr, Ipv4Addr};
    use uuid::Uuid;

    fn arb_layer() -> impl Strategy<Value = FilterLayer> {
        prop_oneof![
            Just(FilterLayer::OutboundV4),
            Just(FilterLayer::InboundV4),
            Just(FilterLayer::OutboundV6),
            Just(FilterLayer::InboundV6),
        ]
    }

    prop_compose! {
        fn arb_v4_network()(address in any::<u32>(), prefix in 0u8..=32) -> IpNetwork {
            IpNetwork::new(IpAddr::V4(Ipv4Addr::from(address)), prefix)
                .expect("prefix is within range")
        }
    }

    proptest! {
        #[test]
        fn test_v4_address_condition_validity_follows_layer_family(
            layer in arb_layer(),
            network in arb_v4_network(),
        ) {
            let result = ConditionBuilder::new(layer)
                .add(Condition::RemoteAddress(network));

            prop_assert_eq!(
                result.is_ok(),
                matches!(layer, FilterLayer::OutboundV4 | FilterLayer::InboundV4)
            );
        }

        #[test]
        fn test_builder_requires_exactly_key_layer_and_action(
            with_key in any::<bool>(),
            with_layer in any::<bool>(),
            with_action in any::<bool>(),
        ) {
            let mut builder = FilterBuilder::new().weight(WeightClass::Max);

            if with_key {
                builder = builder.key(Uuid::from_u128(7));
            }
            if with_layer {
                builder = builder.layer(FilterLayer::OutboundV4);
            }
            if with_action {
                builder = builder.permit();
            }

            prop_assert_eq!(
                builder.build().is_ok(),
                with_key && with_layer && with_action
            );
        }

        #[test]
        fn test_condition_insertion_order_is_preserved(ports in proptest::collection::vec(1u16..=u16::MAX, 1..8)) {
            let mut builder = ConditionBuilder::new(FilterLayer::InboundV4);
            for port in &ports {
                builder = builder.add(Condition::LocalPort(*port)).unwrap();
            }

            let set = builder.build();
            let recovered: Vec<u16> = set
                .conditions()
                .iter()
                .map(|condition| match condition {
                    Condition::LocalPort(port) => *port,
                    other => panic!("unexpected condition {other:?}"),
                })
                .collect();

            prop_assert_eq!(recovered, ports);
        }
    }
}
