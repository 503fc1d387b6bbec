//! ksfw maintenance tool
//!
//! Command-line entry points for the procedures packaging scripts run
//! around an install, uninstall or system update. The firewall runtime
//! never calls these.
//!
//! # Usage
//!
//! ```bash
//! # Remove the invoking user's profile directory
//! ksfw cleanup logs-cache
//!
//! # Remove the service account's cache, keeping its settings
//! ksfw cleanup cache --scope service-user
//!
//! # Drop only the cached relay list
//! ksfw cleanup relay-cache --scope service-user
//!
//! # Recover settings preserved by a system update
//! ksfw migrate --backup-root /var/lib/ksfw.old
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use nix::unistd::Uid;

use ksfw::maintenance::cleanup::{self, CleanupScope};
use ksfw::maintenance::locations::ProfileLocations;
use ksfw::maintenance::migration;

#[derive(Parser)]
#[command(name = "ksfw")]
#[command(about = "Kill-switch firewall maintenance tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove profile data left behind by the firewall
    Cleanup {
        /// What to remove
        #[arg(value_enum)]
        target: CleanupTarget,

        /// Which principal's profile to clean
        #[arg(short, long, value_enum, default_value = "current-user")]
        scope: ScopeArg,
    },
    /// Recover service settings preserved by a system update
    Migrate {
        /// Root directory the update moved the old system state under
        #[arg(long)]
        backup_root: PathBuf,

        /// Uid that must own the backup location
        #[arg(long, default_value_t = 0)]
        trusted_owner: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CleanupTarget {
    /// The whole profile directory
    LogsCache,
    /// Everything except the settings files
    Cache,
    /// Exactly the settings files
    Settings,
    /// Exactly the cached relay list
    RelayCache,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    CurrentUser,
    OtherUsers,
    ServiceUser,
}

impl From<ScopeArg> for CleanupScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::CurrentUser => CleanupScope::CurrentUser,
            ScopeArg::OtherUsers => CleanupScope::OtherUsers,
            ScopeArg::ServiceUser => CleanupScope::ServiceUser,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> ksfw::Result<()> {
    let locations = ProfileLocations::discover().ok_or_else(|| {
        ksfw::Error::Configuration("could not resolve profile directories".into())
    })?;

    match command {
        Commands::Cleanup { target, scope } => {
            let scope = scope.into();
            match target {
                CleanupTarget::LogsCache => cleanup::remove_logs_cache(&locations, scope),
                CleanupTarget::Cache => cleanup::remove_cache(&locations, scope),
                CleanupTarget::Settings => cleanup::remove_settings(&locations, scope),
                CleanupTarget::RelayCache => cleanup::remove_relay_cache(&locations, scope),
            }
        }
        Commands::Migrate {
            backup_root,
            trusted_owner,
        } => {
            let status = migration::migrate_after_update(
                &locations,
                &backup_root,
                Uid::from_raw(trusted_owner),
            )?;
            println!("{status}");
            Ok(())
        }
    }
}
