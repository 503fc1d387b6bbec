//! Filter descriptor values and the builder that assembles them
//!
//! A [`FilterDescriptor`] is the complete description of one filter as the
//! packet-filtering engine sees it: a stable identity key, display metadata,
//! the evaluation layer, the owning provider and sublayer, a precedence
//! weight class and a permit/block action. Descriptors are produced by
//! [`FilterBuilder`], a value-chaining builder that can be cloned and reused
//! as a template for the several filters one rule installs.
//!
//! # Identity
//!
//! The identity key never changes meaning across versions. Installing a
//! filter under a key that is already present supersedes the old filter
//! instead of duplicating it, which is what makes rule application
//! idempotent.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{Error, Result};

/// Address family a filtering layer evaluates
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
pub enum AddressFamily {
    #[strum(serialize = "v4")]
    V4,
    #[strum(serialize = "v6")]
    V6,
}

/// Traffic direction a filtering layer evaluates
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
pub enum Direction {
    #[strum(serialize = "outbound")]
    Outbound,
    #[strum(serialize = "inbound")]
    Inbound,
}

/// Fixed evaluation point in the network stack where a filter is installed
///
/// The engine evaluates outbound connect and inbound accept independently,
/// per address family. A rule that must cover both directions installs one
/// filter per layer.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum FilterLayer {
    /// Outbound connect, IPv4
    #[strum(serialize = "outbound-v4")]
    OutboundV4,
    /// Inbound accept, IPv4
    #[strum(serialize = "inbound-v4")]
    InboundV4,
    /// Outbound connect, IPv6
    #[strum(serialize = "outbound-v6")]
    OutboundV6,
    /// Inbound accept, IPv6
    #[strum(serialize = "inbound-v6")]
    InboundV6,
}

impl FilterLayer {
    /// Returns the address family this layer evaluates
    pub const fn family(self) -> AddressFamily {
        match self {
            FilterLayer::OutboundV4 | FilterLayer::InboundV4 => AddressFamily::V4,
            FilterLayer::OutboundV6 | FilterLayer::InboundV6 => AddressFamily::V6,
        }
    }

    /// Returns the traffic direction this layer evaluates
    pub const fn direction(self) -> Direction {
        match self {
            FilterLayer::OutboundV4 | FilterLayer::OutboundV6 => Direction::Outbound,
            FilterLayer::InboundV4 | FilterLayer::InboundV6 => Direction::Inbound,
        }
    }

    /// Returns the layer name as a static string
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterLayer::OutboundV4 => "outbound-v4",
            FilterLayer::InboundV4 => "inbound-v4",
            FilterLayer::OutboundV6 => "outbound-v6",
            FilterLayer::InboundV6 => "inbound-v6",
        }
    }
}

/// Coarse precedence class breaking ties between filters that share a
/// layer and sublayer
///
/// Higher always wins. Weight ordering is the sole precedence mechanism
/// between co-located filters; rules never rely on installation order.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum WeightClass {
    /// Lowest precedence; used by the default-deny baseline so every
    /// exception outranks it
    #[strum(serialize = "min")]
    Min,
    #[default]
    #[strum(serialize = "medium")]
    Medium,
    /// Highest precedence; used by permit exceptions
    #[strum(serialize = "max")]
    Max,
}

/// Verdict a filter renders when its conditions match
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
pub enum Action {
    #[strum(serialize = "permit")]
    Permit,
    #[strum(serialize = "block")]
    Block,
}

impl Action {
    /// Returns the action name as a static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Permit => "permit",
            Action::Block => "block",
        }
    }
}

/// Complete, immutable description of one filter
///
/// Constructed via [`FilterBuilder::build`] and submitted to an installer
/// together with a condition set. Descriptors carry no state beyond the
/// identity key; they are built fresh on every rule application and
/// discarded after submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterDescriptor {
    /// Stable identity key; reinstalling under the same key supersedes
    pub key: Uuid,
    /// Display name for diagnostics
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Identity of the software component owning this filter
    pub provider: Option<Uuid>,
    /// Evaluation point this filter is installed at
    pub layer: FilterLayer,
    /// Policy-domain grouping within the layer
    pub sublayer: Option<Uuid>,
    /// Precedence among co-located filters
    pub weight: WeightClass,
    /// Verdict when the conditions match
    pub action: Action,
}

/// Value-chaining builder for [`FilterDescriptor`]
///
/// Every mutation consumes and returns the builder, so a configured builder
/// doubles as a template: clone it, override key/name/layer, and build the
/// next filter of the same rule. [`FilterBuilder::build`] takes `&self` and
/// validates that the identity key, layer and action have all been set;
/// omitting any of them is a configuration error, never a silent default.
///
/// # Example
///
/// ```
/// use ksfw::core::filter::{Action, FilterBuilder, FilterLayer, WeightClass};
/// use uuid::Uuid;
///
/// let template = FilterBuilder::new()
///     .provider(Uuid::nil())
///     .weight(WeightClass::Max)
///     .permit();
///
/// let filter = template
///     .clone()
///     .key(Uuid::nil())
///     .name("Permit outbound on loopback (IPv4)")
///     .layer(FilterLayer::OutboundV4)
///     .build()
///     .unwrap();
///
/// assert_eq!(filter.action, Action::Permit);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    key: Option<Uuid>,
    name: Option<String>,
    description: Option<String>,
    provider: Option<Uuid>,
    layer: Option<FilterLayer>,
    sublayer: Option<Uuid>,
    weight: WeightClass,
    action: Option<Action>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stable identity key (required)
    pub fn key(mut self, key: Uuid) -> Self {
        self.key = Some(key);
        self
    }

    /// Sets the display name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the longer description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the owning provider identity
    pub fn provider(mut self, provider: Uuid) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the evaluation layer (required)
    pub fn layer(mut self, layer: FilterLayer) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Sets the sublayer identity
    pub fn sublayer(mut self, sublayer: Uuid) -> Self {
        self.sublayer = Some(sublayer);
        self
    }

    /// Sets the precedence weight class
    pub fn weight(mut self, weight: WeightClass) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the action to permit (an action is required)
    pub fn permit(mut self) -> Self {
        self.action = Some(Action::Permit);
        self
    }

    /// Sets the action to block (an action is required)
    pub fn block(mut self) -> Self {
        self.action = Some(Action::Block);
        self
    }

    /// Produces the finished descriptor without consuming the builder
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the identity key, layer or
    /// action has not been set.
    pub fn build(&self) -> Result<FilterDescriptor> {
        let key = self.key.ok_or_else(|| missing("identity key"))?;
        let layer = self.layer.ok_or_else(|| missing("layer"))?;
        let action = self.action.ok_or_else(|| missing("action"))?;

        Ok(FilterDescriptor {
            key,
            name: self.name.clone().unwrap_or_default(),
            description: self.description.clone(),
            provider: self.provider,
            layer,
            sublayer: self.sublayer,
            weight: self.weight,
            action,
        })
    }
}

fn missing(field: &str) -> Error {
    Error::Configuration(format!("filter descriptor is missing its {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_key_layer_action() {
        let builder = FilterBuilder::new()
            .name("incomplete")
            .weight(WeightClass::Max);

        assert!(matches!(builder.build(), Err(Error::Configuration(_))));

        let builder = builder.key(Uuid::nil());
        assert!(matches!(builder.build(), Err(Error::Configuration(_))));

        let builder = builder.layer(FilterLayer::OutboundV4);
        assert!(matches!(builder.build(), Err(Error::Configuration(_))));

        let descriptor = builder.permit().build().unwrap();
        assert_eq!(descriptor.layer, FilterLayer::OutboundV4);
        assert_eq!(descriptor.action, Action::Permit);
        assert_eq!(descriptor.weight, WeightClass::Max);
    }

    #[test]
    fn test_builder_reuse_as_template() {
        let template = FilterBuilder::new()
            .provider(Uuid::nil())
            .weight(WeightClass::Max)
            .permit();

        let first = template
            .clone()
            .key(Uuid::from_u128(1))
            .name("first")
            .layer(FilterLayer::OutboundV4)
            .build()
            .unwrap();

        let second = template
            .key(Uuid::from_u128(2))
            .name("second")
            .layer(FilterLayer::InboundV4)
            .build()
            .unwrap();

        assert_eq!(first.weight, second.weight);
        assert_eq!(first.provider, second.provider);
        assert_ne!(first.key, second.key);
        assert_ne!(first.layer, second.layer);
    }

    #[test]
    fn test_weight_class_total_order() {
        assert!(WeightClass::Min < WeightClass::Medium);
        assert!(WeightClass::Medium < WeightClass::Max);
    }

    #[test]
    fn test_layer_family_and_direction() {
        assert_eq!(FilterLayer::OutboundV4.family(), AddressFamily::V4);
        assert_eq!(FilterLayer::InboundV6.family(), AddressFamily::V6);
        assert_eq!(FilterLayer::OutboundV6.direction(), Direction::Outbound);
        assert_eq!(FilterLayer::InboundV4.direction(), Direction::Inbound);
    }
}
