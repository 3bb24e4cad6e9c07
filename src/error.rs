//! # Error — Sieve Error Types
//!
//! All fallible operations in this crate return [`SieveError`]. Errors are
//! raised synchronously at the call site that introduced the invalid state,
//! before any sieving work starts; the cross-off loops themselves are
//! infallible once their buffers are allocated.

use thiserror::Error;

/// Errors reported by the sieve.
#[derive(Debug, Error)]
pub enum SieveError {
    /// A parameter violates its documented precondition (start/stop out of
    /// range, unknown flag bits, stop < start, missing callback).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A count index outside 0..=6 was passed to [`crate::PrimeSieve::counts`].
    #[error("count index {0} out of range (valid: 0..=6)")]
    OutOfRange(u32),

    /// An engine buffer or bucket ring could not be allocated.
    #[error("out of memory allocating {what} ({bytes} bytes)")]
    ResourceExhausted { what: &'static str, bytes: usize },
}

pub type Result<T> = std::result::Result<T, SieveError>;

impl SieveError {
    /// Shorthand used by the allocation sites that go through `try_reserve`.
    pub(crate) fn alloc(what: &'static str, bytes: usize) -> Self {
        SieveError::ResourceExhausted { what, bytes }
    }
}
