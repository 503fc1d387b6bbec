//! Scoped effective-uid switching
//!
//! Touching another principal's files happens under that principal's
//! effective uid. The switch is held in a guard so the original identity
//! is restored on every exit path - normal return, early return or error -
//! never through manually paired calls.

use nix::unistd::{Uid, geteuid, seteuid};
use tracing::error;

use crate::core::error::{Error, Result};

/// Scoped effective-uid switch
///
/// While the guard lives, the process acts as the target user. Dropping
/// the guard restores the saved identity; the real uid stays root, which
/// is what makes the restore possible.
#[derive(Debug)]
pub struct EffectiveUser {
    saved: Uid,
}

impl EffectiveUser {
    /// Switches the effective uid to `target`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Privilege`] if the switch is refused.
    pub fn switch(target: Uid) -> Result<Self> {
        let saved = geteuid();

        seteuid(target).map_err(|errno| {
            Error::Privilege(format!(
                "could not switch effective uid to {target}: {errno}"
            ))
        })?;

        Ok(Self { saved })
    }
}

impl Drop for EffectiveUser {
    fn drop(&mut self) {
        if let Err(errno) = seteuid(self.saved) {
            // Nothing sensible to do beyond recording it; continuing with
            // the wrong identity is the caller's signal to bail out.
            error!(uid = %self.saved, %errno, "failed to restore effective uid");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_to_current_euid_is_a_noop() {
        let current = geteuid();
        let guard = EffectiveUser::switch(current).unwrap();
        assert_eq!(geteuid(), current);
        drop(guard);
        assert_eq!(geteuid(), current);
    }

    #[test]
    fn test_switch_to_another_uid_fails_without_privileges() {
        if geteuid().is_root() {
            return;
        }

        let other = Uid::from_raw(geteuid().as_raw() + 1);
        let result = EffectiveUser::switch(other);
        assert!(matches!(result, Err(Error::Privilege(_))));
    }
}
