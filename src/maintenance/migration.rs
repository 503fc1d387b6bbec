//! One-shot settings recovery after a system update replaced the service
//! profile
//!
//! Some system updates move the previous installation aside instead of
//! preserving it in place. This procedure checks whether settings already
//! exist at the destination, whether there is anything to recover, and
//! whether the preserved tree is owned by the trusted system identity,
//! then copies the settings files over and deletes each source only after
//! its copy succeeded.
//!
//! The procedure is idempotent: once settings exist at the destination,
//! every further invocation reports [`MigrationStatus::Aborted`] without
//! touching the backup.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use nix::unistd::Uid;
use tracing::{debug, info};

use crate::core::error::{Error, Result};
use crate::maintenance::locations::{ACCOUNT_HISTORY_FILE, ProfileLocations, SETTINGS_FILE};

/// Outcome of a migration attempt that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MigrationStatus {
    /// Settings already exist at the destination; the backup was not touched
    #[strum(serialize = "Aborted")]
    Aborted,
    /// No preserved profile exists
    #[strum(serialize = "Nothing to migrate")]
    NothingToMigrate,
    /// The settings files were recovered
    #[strum(serialize = "Success")]
    Success,
}

struct FileMigration {
    filename: &'static str,
    required: bool,
}

const FILES_TO_MIGRATE: [FileMigration; 2] = [
    FileMigration {
        filename: SETTINGS_FILE,
        required: true,
    },
    FileMigration {
        filename: ACCOUNT_HISTORY_FILE,
        required: false,
    },
];

/// Recovers the service settings from a preserved pre-update tree
///
/// `backup_root` is the root the update moved the old system state under;
/// the old profile is expected at the service profile's path relative to
/// it. `trusted_owner` is the only uid allowed to own the backup root.
///
/// # Errors
///
/// Returns [`Error::Security`] if the backup root's ownership cannot be
/// read or belongs to anyone but `trusted_owner`, and
/// [`Error::Migration`] if the destination cannot be created or a
/// required file fails to copy. Optional files fail silently.
pub fn migrate_after_update(
    locations: &ProfileLocations,
    backup_root: &Path,
    trusted_owner: Uid,
) -> Result<MigrationStatus> {
    let profile = locations.service_profile();

    // The main settings file marks a populated profile; never overwrite it.
    if profile.join(SETTINGS_FILE).exists() {
        return Ok(MigrationStatus::Aborted);
    }

    let relative_profile = profile.strip_prefix("/").unwrap_or(profile);
    let backup_profile = backup_root.join(relative_profile);

    if !backup_profile.exists() {
        return Ok(MigrationStatus::NothingToMigrate);
    }

    verify_owner(backup_root, trusted_owner)?;

    if !profile.exists() {
        fs::create_dir_all(profile).map_err(|error| {
            Error::Migration(format!(
                "could not create destination directory during migration: {error}"
            ))
        })?;
    }

    //
    // Copy and delete files. A required file failing to copy fails the
    // whole migration, but only after every file had its chance - an
    // optional file that made it across stays migrated.
    //

    let mut copy_status = true;

    for file in &FILES_TO_MIGRATE {
        let from = backup_profile.join(file.filename);
        let to = profile.join(file.filename);

        if copy_regular_file(&from, &to) {
            if let Err(error) = fs::remove_file(&from) {
                debug!(path = %from.display(), %error, "could not remove migrated source");
            }
        } else if file.required {
            copy_status = false;
        }
    }

    if !copy_status {
        return Err(Error::Migration(
            "failed to copy files during migration".into(),
        ));
    }

    info!(destination = %profile.display(), "settings migration complete");
    Ok(MigrationStatus::Success)
}

/// Checks that `path` is owned by the trusted system identity
fn verify_owner(path: &Path, trusted_owner: Uid) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|error| {
        Error::Security(format!(
            "could not acquire ownership of backup location: {error}"
        ))
    })?;

    if metadata.uid() == trusted_owner.as_raw() {
        Ok(())
    } else {
        Err(Error::Security(format!(
            "backup location is not owned by the trusted system identity (uid {trusted_owner})"
        )))
    }
}

/// Copies `from` to `to` if `from` is a regular file; symlinks are never
/// followed
fn copy_regular_file(from: &Path, to: &Path) -> bool {
    match fs::symlink_metadata(from) {
        Ok(metadata) if metadata.file_type().is_file() => fs::copy(from, to).is_ok(),
        _ => false,
    }
}
