//! Error taxonomy for bundle loading and locale selection.
//!
//! None of these ever reach a UI caller as a failure: load errors are turned
//! into "no value available" at the cache boundary and locale errors leave the
//! previous state in place.

use thiserror::Error;

/// Why a (language, namespace) bundle could not be produced.
///
/// `Clone` so a single coalesced load can hand the same outcome to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// No bundle exists for the language/namespace combination.
    #[error("no bundle at {source_id}")]
    NotFound { source_id: String },

    /// The source exists but could not be parsed or failed structural checks.
    #[error("malformed bundle at {source_id}: {reason}")]
    Malformed { source_id: String, reason: String },

    /// The bundle declares a different language or namespace than requested.
    #[error("bundle at {source_id} declares {field} '{declared}' but '{requested}' was requested")]
    IntegrityMismatch {
        source_id: String,
        field: &'static str,
        requested: String,
        declared: String,
    },

    /// The load did not finish before the configured deadline.
    #[error("loading {source_id} exceeded {timeout_ms}ms")]
    Timeout { source_id: String, timeout_ms: u64 },

    /// Transport or IO failure other than absence.
    #[error("bundle source {source_id} unavailable: {reason}")]
    Unavailable { source_id: String, reason: String },
}

impl LoadError {
    /// Short machine-readable name, used in logs and analytics events.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "not_found",
            LoadError::Malformed { .. } => "malformed",
            LoadError::IntegrityMismatch { .. } => "integrity_mismatch",
            LoadError::Timeout { .. } => "timeout",
            LoadError::Unavailable { .. } => "unavailable",
        }
    }

    /// Identifier of the resource that failed.
    pub fn source_id(&self) -> &str {
        match self {
            LoadError::NotFound { source_id }
            | LoadError::Malformed { source_id, .. }
            | LoadError::IntegrityMismatch { source_id, .. }
            | LoadError::Timeout { source_id, .. }
            | LoadError::Unavailable { source_id, .. } => source_id,
        }
    }
}

/// Rejected locale input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    /// The code is not in the supported, enabled set.
    #[error("unsupported language code: '{code}'")]
    Unsupported { code: String },
}
