//! ksfw - Kill-Switch Firewall engine
//!
//! The rule-composition and atomic-application engine behind a host
//! packet-filtering firewall used as a VPN kill switch. Named, parameterized
//! network-access intents ("permit loopback traffic", "permit this host's
//! DHCP server exchange") are translated into precise, ordered filter
//! descriptors and installed transactionally, so the resulting state never
//! silently under-blocks.
//!
//! # Architecture
//!
//! - [`core`] - Conditions, filter builders, rules, policies and the
//!   installer seams to the packet-filtering engine
//! - [`maintenance`] - Cleanup and settings-migration procedures invoked by
//!   installer/uninstaller tooling, not by the firewall runtime
//!
//! # Safety Properties
//!
//! - Required descriptor fields are validated at build time, never defaulted
//! - Condition sets reject predicates their layer cannot evaluate
//! - Stable identity keys make repeated installation supersede, not duplicate
//! - A policy either applies completely or leaves the engine untouched

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod core;
pub mod maintenance;

// Re-export commonly used types
pub use core::error::{Error, Result};
pub use core::policy::{Policy, PolicySettings};
pub use core::rules::FirewallRule;
