//! The engine's sole write interface to the packet-filtering engine
//!
//! The core never opens, commits or rolls back an engine session itself; it
//! only issues filter additions inside a transaction the caller already
//! holds open. [`FilterInstaller`] is that single write seam, and
//! [`TransactionalEngine`] is the caller-held session the policy layer
//! drives it through.

use crate::core::condition::ConditionSet;
use crate::core::error::Result;
use crate::core::filter::FilterDescriptor;

/// Accepts one descriptor and condition-set pair inside an open transaction
///
/// Every rule submits its filters through this trait and nothing else.
/// A returned error means the engine rejected the addition; the rule
/// propagates it immediately and never compensates for filters it already
/// submitted.
pub trait FilterInstaller {
    /// Adds one filter to the open transaction
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FilterRejected`] (or an implementation's own
    /// error) if the engine refuses the addition.
    fn add_filter(&mut self, filter: &FilterDescriptor, conditions: &ConditionSet) -> Result<()>;
}

/// Caller-held engine session able to run one atomic transaction
///
/// # Contract
///
/// Implementations MUST discard every filter added through the installer
/// handed to `body` when `body` returns `Err`, and make all of them visible
/// when it returns `Ok`. The whole policy applied inside one call either
/// takes effect or leaves the engine untouched; nothing in the core layers
/// below performs partial rollback.
pub trait TransactionalEngine {
    /// Runs `body` inside one transaction
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `body` after rolling the
    /// transaction back, or an implementation error if the transaction
    /// itself cannot be opened or committed.
    fn execute(
        &mut self,
        body: &mut dyn FnMut(&mut dyn FilterInstaller) -> Result<()>,
    ) -> Result<()>;
}
