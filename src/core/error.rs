use thiserror::Error;
use uuid::Uuid;

use crate::core::condition::ConditionKind;
use crate::core::filter::FilterLayer;

/// Core error types for ksfw
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid rule parameter or incomplete filter descriptor, detected
    /// before anything is submitted to the filter engine
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A condition kind was added to a set bound to a layer it cannot
    /// be evaluated on
    #[error("Condition '{kind}' is not valid on layer '{layer}'")]
    IncompatibleCondition {
        kind: ConditionKind,
        layer: FilterLayer,
    },

    /// The filter engine rejected a filter addition
    #[error("Filter engine rejected '{name}' ({key})")]
    FilterRejected { key: Uuid, name: String },

    /// Two rules in one policy declared the same filter identity key
    #[error("Policy '{policy}' contains duplicate filter key {key}")]
    DuplicateFilterKey { key: Uuid, policy: String },

    /// Ownership or security descriptor verification failed
    #[error("Security error: {0}")]
    Security(String),

    /// A privileged lookup or privilege adjustment failed
    #[error("Privilege error: {0}")]
    Privilege(String),

    /// Settings migration failed for a required file
    #[error("Migration error: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
