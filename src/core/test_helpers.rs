//! Shared test utilities for core module tests
//!
//! Provides a recording installer and an in-memory transactional engine so
//! rule and policy tests never need a real packet-filtering engine. This
//! module is only compiled in test mode; the integration test suite keeps
//! its own copies.

use crate::core::condition::ConditionSet;
use crate::core::error::{Error, Result};
use crate::core::filter::{FilterDescriptor, FilterLayer};
use crate::core::install::{FilterInstaller, TransactionalEngine};

/// One descriptor/condition-set pair as a rule submitted it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFilter {
    pub descriptor: FilterDescriptor,
    pub conditions: ConditionSet,
}

/// Installer that records every addition, optionally rejecting the k-th
#[derive(Debug, Default)]
pub struct RecordingInstaller {
    pub added: Vec<RecordedFilter>,
    calls: usize,
    fail_on_call: Option<usize>,
}

impl RecordingInstaller {
    /// Creates an installer that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an installer that rejects the `call`-th addition (1-based)
    /// and accepts every other one
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    /// Number of add-filter calls seen, including the rejected one
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Layers of the accepted filters, in submission order
    pub fn layers(&self) -> Vec<FilterLayer> {
        self.added
            .iter()
            .map(|filter| filter.descriptor.layer)
            .collect()
    }
}

impl FilterInstaller for RecordingInstaller {
    fn add_filter(&mut self, filter: &FilterDescriptor, conditions: &ConditionSet) -> Result<()> {
        self.calls += 1;

        if self.fail_on_call == Some(self.calls) {
            return Err(Error::FilterRejected {
                key: filter.key,
                name: filter.name.clone(),
            });
        }

        self.added.push(RecordedFilter {
            descriptor: filter.clone(),
            conditions: conditions.clone(),
        });

        Ok(())
    }
}

/// In-memory engine honoring the [`TransactionalEngine`] contract
///
/// Additions inside a failed transaction are discarded wholesale.
/// Committed filters are keyed by identity: re-adding a key supersedes the
/// previous filter, matching the engine's idempotence guarantee.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    pub installed: Vec<RecordedFilter>,
    pub committed_transactions: usize,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionalEngine for MemoryEngine {
    fn execute(
        &mut self,
        body: &mut dyn FnMut(&mut dyn FilterInstaller) -> Result<()>,
    ) -> Result<()> {
        let mut scratch = RecordingInstaller::new();

        body(&mut scratch)?;

        for filter in scratch.added {
            let key = filter.descriptor.key;
            match self
                .installed
                .iter_mut()
                .find(|existing| existing.descriptor.key == key)
            {
                Some(existing) => *existing = filter,
                None => self.installed.push(filter),
            }
        }

        self.committed_transactions += 1;
        Ok(())
    }
}
