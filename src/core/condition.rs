//! Typed filter predicates and the layer-bound set builder
//!
//! A [`Condition`] is one predicate attached to a filter: protocol equals,
//! local/remote port equals, local/remote address matches, ICMP type/code
//! equals, or "is loopback traffic". Conditions are accumulated through a
//! [`ConditionBuilder`] bound to one filtering layer; every added condition
//! is validated against that layer, so a set can never reach the engine
//! with a predicate the layer cannot evaluate.
//!
//! All conditions within one set are logically ANDed. Predicates that match
//! one address out of several (for example the private LAN ranges) carry
//! the whole set of networks in a single condition, keeping the AND
//! semantics of the set itself intact.

use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::filter::{AddressFamily, FilterLayer};

/// Transport protocol selector for [`Condition::Protocol`]
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum TransportProtocol {
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(serialize = "udp")]
    Udp,
    #[strum(serialize = "icmpv6")]
    IcmpV6,
}

/// Discriminant of a [`Condition`], used for layer-compatibility reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum ConditionKind {
    #[strum(serialize = "protocol")]
    Protocol,
    #[strum(serialize = "local-port")]
    LocalPort,
    #[strum(serialize = "remote-port")]
    RemotePort,
    #[strum(serialize = "local-address")]
    LocalAddress,
    #[strum(serialize = "remote-address")]
    RemoteAddress,
    #[strum(serialize = "interface")]
    Interface,
    #[strum(serialize = "icmp-type")]
    IcmpType,
    #[strum(serialize = "icmp-code")]
    IcmpCode,
    #[strum(serialize = "loopback")]
    Loopback,
}

/// A single typed predicate attached to a filter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Condition {
    /// Transport protocol equals
    Protocol(TransportProtocol),
    /// Local port equals
    LocalPort(u16),
    /// Remote port equals
    RemotePort(u16),
    /// Local address lies within the network
    LocalAddress(IpNetwork),
    /// Remote address lies within the network
    RemoteAddress(IpNetwork),
    /// Remote address lies within any of the networks
    RemoteAddressIn(Vec<IpNetwork>),
    /// Remote address differs from the host
    RemoteAddressNot(IpAddr),
    /// Traffic crosses the named interface
    Interface(String),
    /// Traffic does not cross the named interface
    InterfaceNot(String),
    /// ICMP message type equals
    IcmpType(u8),
    /// ICMP message code equals
    IcmpCode(u8),
    /// Traffic is loopback traffic
    Loopback,
}

impl Condition {
    /// Returns the discriminant of this condition
    pub fn kind(&self) -> ConditionKind {
        match self {
            Condition::Protocol(_) => ConditionKind::Protocol,
            Condition::LocalPort(_) => ConditionKind::LocalPort,
            Condition::RemotePort(_) => ConditionKind::RemotePort,
            Condition::LocalAddress(_) => ConditionKind::LocalAddress,
            Condition::RemoteAddress(_) | Condition::RemoteAddressIn(_) => {
                ConditionKind::RemoteAddress
            }
            Condition::RemoteAddressNot(_) => ConditionKind::RemoteAddress,
            Condition::Interface(_) | Condition::InterfaceNot(_) => ConditionKind::Interface,
            Condition::IcmpType(_) => ConditionKind::IcmpType,
            Condition::IcmpCode(_) => ConditionKind::IcmpCode,
            Condition::Loopback => ConditionKind::Loopback,
        }
    }

    /// Checks that this condition can be evaluated on the given layer
    ///
    /// Address predicates must match the layer's address family, and the
    /// ICMPv6 protocol selector only exists on IPv6 layers. Port, interface
    /// and loopback predicates are valid on every layer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleCondition`] on a family mismatch, or
    /// [`Error::Configuration`] for an address-set condition whose networks
    /// do not all share one family.
    pub fn validate_for(&self, layer: FilterLayer) -> Result<()> {
        let family = match self {
            Condition::Protocol(TransportProtocol::IcmpV6) => Some(AddressFamily::V6),
            Condition::LocalAddress(network) | Condition::RemoteAddress(network) => {
                Some(network_family(network))
            }
            Condition::RemoteAddressIn(networks) => Some(uniform_family(networks)?),
            Condition::RemoteAddressNot(address) => Some(address_family(*address)),
            _ => None,
        };

        match family {
            Some(required) if required != layer.family() => Err(Error::IncompatibleCondition {
                kind: self.kind(),
                layer,
            }),
            _ => Ok(()),
        }
    }
}

fn address_family(address: IpAddr) -> AddressFamily {
    match address {
        IpAddr::V4(_) => AddressFamily::V4,
        IpAddr::V6(_) => AddressFamily::V6,
    }
}

fn network_family(network: &IpNetwork) -> AddressFamily {
    match network {
        IpNetwork::V4(_) => AddressFamily::V4,
        IpNetwork::V6(_) => AddressFamily::V6,
    }
}

fn uniform_family(networks: &[IpNetwork]) -> Result<AddressFamily> {
    let mut families = networks.iter().map(network_family);

    let first = families.next().ok_or_else(|| {
        Error::Configuration("address-set condition must name at least one network".into())
    })?;

    if families.all(|family| family == first) {
        Ok(first)
    } else {
        Err(Error::Configuration(
            "address-set condition mixes IPv4 and IPv6 networks".into(),
        ))
    }
}

/// Ordered, immutable set of conditions bound to one filtering layer
///
/// An empty set matches all traffic on its layer; the default-deny
/// baseline uses exactly that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionSet {
    layer: FilterLayer,
    conditions: Vec<Condition>,
}

impl ConditionSet {
    /// Creates an empty set that matches all traffic on `layer`
    pub fn match_all(layer: FilterLayer) -> Self {
        Self {
            layer,
            conditions: Vec::new(),
        }
    }

    /// Returns the layer this set is bound to
    pub fn layer(&self) -> FilterLayer {
        self.layer
    }

    /// Returns the conditions in insertion order
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Accumulates conditions for one filter, validating each against the
/// bound layer
///
/// # Example
///
/// ```
/// use ksfw::core::condition::{Condition, ConditionBuilder, TransportProtocol};
/// use ksfw::core::filter::FilterLayer;
///
/// let conditions = ConditionBuilder::new(FilterLayer::InboundV4)
///     .add(Condition::Protocol(TransportProtocol::Udp))?
///     .add(Condition::LocalPort(67))?
///     .build();
///
/// assert_eq!(conditions.len(), 2);
/// # Ok::<(), ksfw::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConditionBuilder {
    layer: FilterLayer,
    conditions: Vec<Condition>,
}

impl ConditionBuilder {
    pub fn new(layer: FilterLayer) -> Self {
        Self {
            layer,
            conditions: Vec::new(),
        }
    }

    /// Appends one condition
    ///
    /// # Errors
    ///
    /// Returns the condition's validation error if it cannot be evaluated
    /// on the bound layer; the set is left unchanged in that case.
    pub fn add(mut self, condition: Condition) -> Result<Self> {
        condition.validate_for(self.layer)?;
        self.conditions.push(condition);
        Ok(self)
    }

    /// Finishes the set
    pub fn build(self) -> ConditionSet {
        ConditionSet {
            layer: self.layer,
            conditions: self.conditions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn private_net() -> IpNetwork {
        "10.0.0.0/8".parse().unwrap()
    }

    fn link_local_v6() -> IpNetwork {
        "fe80::/10".parse().unwrap()
    }

    #[test]
    fn test_conditions_accumulate_in_order() {
        let set = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::Protocol(TransportProtocol::Udp))
            .unwrap()
            .add(Condition::LocalPort(68))
            .unwrap()
            .add(Condition::RemotePort(67))
            .unwrap()
            .build();

        assert_eq!(set.layer(), FilterLayer::OutboundV4);
        assert_eq!(
            set.conditions()[0],
            Condition::Protocol(TransportProtocol::Udp)
        );
        assert_eq!(set.conditions()[1], Condition::LocalPort(68));
        assert_eq!(set.conditions()[2], Condition::RemotePort(67));
    }

    #[test]
    fn test_address_family_must_match_layer() {
        let err = ConditionBuilder::new(FilterLayer::OutboundV6)
            .add(Condition::RemoteAddress(private_net()))
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleCondition { .. }));

        let err = ConditionBuilder::new(FilterLayer::InboundV4)
            .add(Condition::LocalAddress(link_local_v6()))
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleCondition { .. }));
    }

    #[test]
    fn test_icmpv6_protocol_requires_v6_layer() {
        let err = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::Protocol(TransportProtocol::IcmpV6))
            .unwrap_err();
        assert!(matches!(err, Error::IncompatibleCondition { .. }));

        assert!(
            ConditionBuilder::new(FilterLayer::OutboundV6)
                .add(Condition::Protocol(TransportProtocol::IcmpV6))
                .is_ok()
        );
    }

    #[test]
    fn test_mixed_family_address_set_rejected() {
        let err = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::RemoteAddressIn(vec![
                private_net(),
                link_local_v6(),
            ]))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_empty_address_set_rejected() {
        let err = ConditionBuilder::new(FilterLayer::OutboundV4)
            .add(Condition::RemoteAddressIn(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_loopback_and_ports_valid_on_every_layer() {
        for layer in [
            FilterLayer::OutboundV4,
            FilterLayer::InboundV4,
            FilterLayer::OutboundV6,
            FilterLayer::InboundV6,
        ] {
            assert!(Condition::Loopback.validate_for(layer).is_ok());
            assert!(Condition::LocalPort(53).validate_for(layer).is_ok());
            assert!(
                Condition::Interface("wg0".into())
                    .validate_for(layer)
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_match_all_is_empty() {
        let set = ConditionSet::match_all(FilterLayer::InboundV6);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_remote_address_not_family_checked() {
        let host = IpAddr::V4(Ipv4Addr::new(10, 64, 0, 1));
        assert!(
            Condition::RemoteAddressNot(host)
                .validate_for(FilterLayer::OutboundV4)
                .is_ok()
        );
        assert!(
            Condition::RemoteAddressNot(host)
                .validate_for(FilterLayer::OutboundV6)
                .is_err()
        );
    }
}
