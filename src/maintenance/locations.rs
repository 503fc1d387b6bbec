//! Well-known profile directories and file names
//!
//! Maintenance operations never guess paths on the fly; they receive a
//! [`ProfileLocations`] value describing where each principal's profile
//! lives. [`ProfileLocations::discover`] resolves the real system layout,
//! and tests inject temporary roots through
//! [`ProfileLocations::with_roots`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Directory name the firewall uses under every profile root
pub const APP_DIR_NAME: &str = "ksfw";

/// The main settings file; required during migration
pub const SETTINGS_FILE: &str = "settings.json";

/// The account history file; optional during migration
pub const ACCOUNT_HISTORY_FILE: &str = "account-history.json";

/// The cached relay list
pub const RELAY_CACHE_FILE: &str = "relays.json";

/// Files that survive cache removal and are the target of settings removal
pub const SETTINGS_FILE_SET: [&str; 2] = [SETTINGS_FILE, ACCOUNT_HISTORY_FILE];

/// Profile directories for every principal scope maintenance can touch
#[derive(Debug, Clone)]
pub struct ProfileLocations {
    current_user: PathBuf,
    users_root: PathBuf,
    service_profile: PathBuf,
}

impl ProfileLocations {
    /// Resolves the real system layout
    ///
    /// The invoking user's profile follows the XDG base directory spec;
    /// other users are found under `/home`; the service keeps its profile
    /// under `/var/lib`.
    pub fn discover() -> Option<Self> {
        let project = ProjectDirs::from("net", "ksfw", APP_DIR_NAME)?;

        Some(Self {
            current_user: project.data_local_dir().to_path_buf(),
            users_root: PathBuf::from("/home"),
            service_profile: PathBuf::from("/var/lib").join(APP_DIR_NAME),
        })
    }

    /// Builds a location table over explicit roots
    pub fn with_roots(
        current_user: impl Into<PathBuf>,
        users_root: impl Into<PathBuf>,
        service_profile: impl Into<PathBuf>,
    ) -> Self {
        Self {
            current_user: current_user.into(),
            users_root: users_root.into(),
            service_profile: service_profile.into(),
        }
    }

    /// The invoking user's own profile directory
    pub fn current_user(&self) -> &Path {
        &self.current_user
    }

    /// Directory containing the home directories of all users
    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    /// The service account's profile directory
    pub fn service_profile(&self) -> &Path {
        &self.service_profile
    }
}
