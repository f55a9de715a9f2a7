//! Error types for perfkit
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Perf Error Enum ==
/// Unified error type for caller misuse.
///
/// Absence and staleness are never errors; only malformed options and
/// configuration are reported through this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PerfError {
    /// An option passed to a single call was invalid
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Configuration loaded at construction time was invalid
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for perfkit.
pub type Result<T> = std::result::Result<T, PerfError>;
