//! Convenience result type alias for ModHub.

use crate::error::HostError;

/// A specialized `Result` type for ModHub operations.
///
/// Defined as a convenience so that every crate does not need to write
/// `Result<T, HostError>` explicitly.
pub type HostResult<T> = Result<T, HostError>;
