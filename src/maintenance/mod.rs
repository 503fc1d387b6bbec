//! Maintenance collaborators invoked by installer and uninstaller tooling
//!
//! Nothing in here runs as part of the firewall itself. These are the
//! one-shot procedures the packaging scripts call around an install,
//! uninstall or system update:
//!
//! - [`cleanup`]: Best-effort removal of profile data, per principal scope
//! - [`migration`]: Check-then-copy-then-delete settings recovery after an
//!   update replaced the service profile
//! - [`locations`]: The well-known directories and file names both operate on
//! - [`privilege`]: The scoped effective-uid switch guard
//!
//! Failure policy differs from the engine core: per-file deletion errors
//! during cleanup are swallowed, while privileged lookups and ownership
//! verification failures are fatal and abort the whole operation.

pub mod cleanup;
pub mod locations;
pub mod migration;
pub mod privilege;
