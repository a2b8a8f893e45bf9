//! Error types for record decoding and sequence management.

use thiserror::Error;

/// A private-region record failed validation.
///
/// Callers treat every variant the same way: the record is absent. The
/// variants exist so the reason can be logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Buffer shorter than the fixed record size.
    #[error("record truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Magic string does not match byte-for-byte.
    #[error("bad magic string")]
    BadMagic,

    /// Magic matched but the version field is not the supported one.
    #[error("unsupported record version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Errors from the descriptor sequence generator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// `next()` was called before `initialize()` or a successful `adopt()`.
    #[error("sequence generator is uninitialized")]
    Uninitialized,

    /// Zero is reserved and cannot be adopted.
    #[error("cannot adopt reserved sequence number 0")]
    ZeroSequence,
}
