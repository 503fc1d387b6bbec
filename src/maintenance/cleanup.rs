//! Best-effort removal of profile data, scoped by principal
//!
//! Four operations, each idempotent and safe to re-run:
//!
//! - [`remove_logs_cache`]: the whole profile directory
//! - [`remove_cache`]: every file except the settings file set
//! - [`remove_settings`]: exactly the settings file set
//! - [`remove_relay_cache`]: exactly the cached relay list
//!
//! Cache and settings removal are deliberately separate operations; each
//! finishes by removing the profile directory only if the other has
//! already emptied it.
//!
//! Per-file deletion errors are swallowed (logged at debug). Errors while
//! resolving another principal's profile are fatal and abort the
//! operation.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use nix::unistd::{Uid, geteuid};
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::maintenance::locations::{
    APP_DIR_NAME, ProfileLocations, RELAY_CACHE_FILE, SETTINGS_FILE_SET,
};
use crate::maintenance::privilege::EffectiveUser;

/// Which principal's profile a cleanup operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter)]
pub enum CleanupScope {
    /// The user invoking the tool
    #[strum(serialize = "current-user")]
    CurrentUser,
    /// Every other user with a home directory on the machine
    #[strum(serialize = "other-users")]
    OtherUsers,
    /// The service account the firewall daemon runs as
    #[strum(serialize = "service-user")]
    ServiceUser,
}

/// Removes the whole profile directory for the scope
///
/// # Errors
///
/// Returns [`crate::Error::Privilege`] if the scope's profile cannot be
/// resolved without privileges this process lacks. Deletion failures are
/// swallowed.
pub fn remove_logs_cache(locations: &ProfileLocations, scope: CleanupScope) -> Result<()> {
    for_each_profile(locations, scope, |dir| {
        remove_dir_all_best_effort(dir);
    })
}

/// Removes every file except the settings file set, then the directory if
/// that left it empty
///
/// # Errors
///
/// Returns [`crate::Error::Privilege`] if the scope's profile cannot be
/// resolved. Deletion failures are swallowed.
pub fn remove_cache(locations: &ProfileLocations, scope: CleanupScope) -> Result<()> {
    for_each_profile(locations, scope, |dir| {
        remove_files_where(dir, |name| !SETTINGS_FILE_SET.contains(&name));
        remove_dir_if_empty(dir);
    })
}

/// Removes exactly the settings file set, then the directory if that left
/// it empty
///
/// # Errors
///
/// Returns [`crate::Error::Privilege`] if the scope's profile cannot be
/// resolved. Deletion failures are swallowed.
pub fn remove_settings(locations: &ProfileLocations, scope: CleanupScope) -> Result<()> {
    for_each_profile(locations, scope, |dir| {
        remove_files_where(dir, |name| SETTINGS_FILE_SET.contains(&name));
        remove_dir_if_empty(dir);
    })
}

/// Removes exactly the cached relay list, leaving every sibling untouched
///
/// # Errors
///
/// Returns [`crate::Error::Privilege`] if the scope's profile cannot be
/// resolved. Deletion failures are swallowed.
pub fn remove_relay_cache(locations: &ProfileLocations, scope: CleanupScope) -> Result<()> {
    for_each_profile(locations, scope, |dir| {
        let cache_file = dir.join(RELAY_CACHE_FILE);
        if let Err(error) = fs::remove_file(&cache_file) {
            debug!(path = %cache_file.display(), %error, "skipping relay cache file");
        }
    })
}

/// Resolves the scope's profile directories and runs `operation` on each
///
/// For other users' profiles, the operation runs under that user's
/// effective uid when this process is root, so a hostile profile tree
/// cannot make root chase symlinks outside it.
fn for_each_profile(
    locations: &ProfileLocations,
    scope: CleanupScope,
    mut operation: impl FnMut(&Path),
) -> Result<()> {
    match scope {
        CleanupScope::CurrentUser => {
            operation(locations.current_user());
            Ok(())
        }
        CleanupScope::ServiceUser => {
            let profile = locations.service_profile();

            // Gaining access to the service account's profile is the
            // privileged part; failing it is fatal, unlike the
            // best-effort deletions that follow.
            if profile.exists() {
                fs::read_dir(profile).map_err(|error| {
                    Error::Privilege(format!(
                        "cannot access service profile {}: {error}",
                        profile.display()
                    ))
                })?;
            }

            operation(profile);
            Ok(())
        }
        CleanupScope::OtherUsers => {
            for home in other_user_homes(locations) {
                let profile = home
                    .join(".local")
                    .join("share")
                    .join(APP_DIR_NAME);

                if geteuid().is_root() {
                    let owner = match fs::metadata(&home) {
                        Ok(metadata) => Uid::from_raw(metadata.uid()),
                        Err(error) => {
                            debug!(path = %home.display(), %error, "skipping unreadable home");
                            continue;
                        }
                    };

                    let _guard = EffectiveUser::switch(owner)?;
                    operation(&profile);
                } else {
                    operation(&profile);
                }
            }
            Ok(())
        }
    }
}

/// Enumerates home directories other than the invoking user's own
fn other_user_homes(locations: &ProfileLocations) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(locations.users_root()) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.path())
        .filter(|home| !locations.current_user().starts_with(home))
        .collect()
}

fn remove_dir_all_best_effort(dir: &Path) {
    if let Err(error) = fs::remove_dir_all(dir) {
        debug!(path = %dir.display(), %error, "skipping profile directory");
    }
}

/// Removes the regular files in `dir` whose names satisfy `matches`
fn remove_files_where(dir: &Path, matches: impl Fn(&str) -> bool) {
    let Ok(entries) = fs::read_dir(dir) else {
        debug!(path = %dir.display(), "profile directory not readable");
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if path.is_file() && matches(name) {
            if let Err(error) = fs::remove_file(&path) {
                debug!(path = %path.display(), %error, "skipping file");
            }
        }
    }
}

/// Fails unless the directory is already empty, which is exactly what is
/// wanted: cache and settings removal are separate operations
fn remove_dir_if_empty(dir: &Path) {
    if let Err(error) = fs::remove_dir(dir) {
        debug!(path = %dir.display(), %error, "leaving non-empty profile directory");
    }
}
