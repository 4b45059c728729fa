//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::cache::DisposeReason;

/// Error produced by a user-supplied dispose callback.
pub type DisposeError = Box<dyn std::error::Error + Send + Sync>;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Rejected construction options
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A dispose callback failed after its entry had already left the cache
    #[error("Dispose callback failed ({reason})")]
    Dispose {
        reason: DisposeReason,
        #[source]
        source: DisposeError,
    },
}

impl CacheError {
    /// Returns the removal cause if this is a disposal failure.
    pub fn dispose_reason(&self) -> Option<DisposeReason> {
        match self {
            CacheError::Dispose { reason, .. } => Some(*reason),
            CacheError::Config(_) => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
