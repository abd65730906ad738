// CLASSIFICATION: COMMUNITY
// Filename: error.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Error taxonomy shared by every SPI layer.
//!
//! Each variant maps to a stable status code so that a failure raised in the
//! service can be carried back to a remote client and rebuilt there.

use spi_wire::CodecError;
use thiserror::Error;

/// Status code reported for success.
pub const STATUS_OK: i32 = 0;

/// Errors returned by controller, driver, dispatch and client operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpiError {
    /// Generic failure, including poisoned locks and HAL faults.
    #[error("operation failed")]
    Failure,
    /// The method table does not provide the requested operation.
    #[error("operation not supported")]
    NotSupported,
    /// Malformed or missing caller input.
    #[error("invalid parameter")]
    InvalidParam,
    /// A required collaborator is absent or not in a usable state.
    #[error("invalid object")]
    InvalidObject,
    /// A scratch allocation could not be satisfied.
    #[error("allocation failed")]
    MallocFail,
    /// A hardware completion did not arrive within its budget.
    #[error("timed out waiting for completion")]
    Timeout,
    /// Malformed or truncated transport buffer.
    #[error("transport buffer i/o error")]
    Io,
    /// No controller or endpoint is published under the requested name.
    #[error("device not found")]
    DeviceNotFound,
}

impl SpiError {
    /// Stable status code carried in reply frames.
    #[must_use]
    pub fn status(self) -> i32 {
        match self {
            SpiError::Failure => -1,
            SpiError::NotSupported => -2,
            SpiError::InvalidParam => -3,
            SpiError::InvalidObject => -4,
            SpiError::MallocFail => -6,
            SpiError::Timeout => -7,
            SpiError::Io => -17,
            SpiError::DeviceNotFound => -201,
        }
    }

    /// Rebuild an error from a status code. Unknown codes collapse to `Failure`.
    #[must_use]
    pub fn from_status(status: i32) -> Option<Self> {
        match status {
            STATUS_OK => None,
            -2 => Some(SpiError::NotSupported),
            -3 => Some(SpiError::InvalidParam),
            -4 => Some(SpiError::InvalidObject),
            -6 => Some(SpiError::MallocFail),
            -7 => Some(SpiError::Timeout),
            -17 => Some(SpiError::Io),
            -201 => Some(SpiError::DeviceNotFound),
            _ => Some(SpiError::Failure),
        }
    }
}

impl From<CodecError> for SpiError {
    fn from(_: CodecError) -> Self {
        SpiError::Io
    }
}

/// Convert an operation result into its wire status.
#[must_use]
pub fn status_of<T>(result: &Result<T, SpiError>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(err) => err.status(),
    }
}

/// Result alias used throughout the crate.
pub type SpiResult<T> = Result<T, SpiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        for err in [
            SpiError::Failure,
            SpiError::NotSupported,
            SpiError::InvalidParam,
            SpiError::InvalidObject,
            SpiError::MallocFail,
            SpiError::Timeout,
            SpiError::Io,
            SpiError::DeviceNotFound,
        ] {
            assert_eq!(SpiError::from_status(err.status()), Some(err));
        }
        assert_eq!(SpiError::from_status(0), None);
        assert_eq!(SpiError::from_status(-99), Some(SpiError::Failure));
    }

    #[test]
    fn codec_errors_become_io() {
        assert_eq!(SpiError::from(CodecError::Truncated), SpiError::Io);
    }
}
