// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Error types for RGA operations

use rga_sys::{
    Version, IM_STATUS, IM_STATUS_ERROR_VERSION, IM_STATUS_FAILED, IM_STATUS_ILLEGAL_PARAM,
    IM_STATUS_INVALID_PARAM, IM_STATUS_NOERROR, IM_STATUS_NOT_SUPPORTED, IM_STATUS_NO_SESSION,
    IM_STATUS_OUT_OF_MEMORY, IM_STATUS_SUCCESS,
};
use std::fmt;
use thiserror::Error;

/// Result type alias for RGA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the RGA
#[derive(Debug, Error)]
pub enum Error {
    /// librga could not be opened or lacks a required symbol
    #[error("failed to load librga: {0}")]
    Library(#[from] rga_sys::LoadError),

    /// The native library rejected an operation
    #[error("{operation} failed: {status} ({detail})")]
    Status {
        /// Name of the native entry point
        operation: &'static str,
        /// Status returned by the library
        status: Status,
        /// Error text reported by `imStrError_t`
        detail: String,
    },

    /// Parameters were rejected before reaching the library
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The destination descriptor was built from a read-only buffer
    #[error("destination buffer is read-only")]
    ReadOnly,

    /// The loaded library does not provide the requested feature
    #[error("{feature} requires librga {required} or newer")]
    Unsupported {
        /// Feature name
        feature: &'static str,
        /// Minimum library version
        required: Version,
    },

    /// I/O error while waiting on fences or buffers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }
}

/// `IM_STATUS` values returned by the im2d API.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    NoError,
    Success,
    NotSupported,
    OutOfMemory,
    InvalidParam,
    IllegalParam,
    ErrorVersion,
    NoSession,
    Failed,
    Unknown(IM_STATUS),
}

impl Status {
    pub fn from_raw(raw: IM_STATUS) -> Self {
        match raw {
            IM_STATUS_NOERROR => Status::NoError,
            IM_STATUS_SUCCESS => Status::Success,
            IM_STATUS_NOT_SUPPORTED => Status::NotSupported,
            IM_STATUS_OUT_OF_MEMORY => Status::OutOfMemory,
            IM_STATUS_INVALID_PARAM => Status::InvalidParam,
            IM_STATUS_ILLEGAL_PARAM => Status::IllegalParam,
            IM_STATUS_ERROR_VERSION => Status::ErrorVersion,
            IM_STATUS_NO_SESSION => Status::NoSession,
            IM_STATUS_FAILED => Status::Failed,
            other => Status::Unknown(other),
        }
    }

    pub fn raw(&self) -> IM_STATUS {
        match self {
            Status::NoError => IM_STATUS_NOERROR,
            Status::Success => IM_STATUS_SUCCESS,
            Status::NotSupported => IM_STATUS_NOT_SUPPORTED,
            Status::OutOfMemory => IM_STATUS_OUT_OF_MEMORY,
            Status::InvalidParam => IM_STATUS_INVALID_PARAM,
            Status::IllegalParam => IM_STATUS_ILLEGAL_PARAM,
            Status::ErrorVersion => IM_STATUS_ERROR_VERSION,
            Status::NoSession => IM_STATUS_NO_SESSION,
            Status::Failed => IM_STATUS_FAILED,
            Status::Unknown(raw) => *raw,
        }
    }

    /// Both `SUCCESS` and `NOERROR` report a completed operation.
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Success | Status::NoError)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NoError => write!(f, "no error"),
            Status::Success => write!(f, "success"),
            Status::NotSupported => write!(f, "not supported"),
            Status::OutOfMemory => write!(f, "out of memory"),
            Status::InvalidParam => write!(f, "invalid parameter"),
            Status::IllegalParam => write!(f, "illegal parameter"),
            Status::ErrorVersion => write!(f, "version mismatch"),
            Status::NoSession => write!(f, "no session"),
            Status::Failed => write!(f, "failed"),
            Status::Unknown(raw) => write!(f, "unknown status {raw}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_known_codes() {
        for raw in -6..=2 {
            assert_eq!(Status::from_raw(raw).raw(), raw);
        }
        assert_eq!(Status::from_raw(-42), Status::Unknown(-42));
    }

    #[test]
    fn test_status_ok() {
        assert!(Status::from_raw(IM_STATUS_SUCCESS).is_ok());
        assert!(Status::from_raw(IM_STATUS_NOERROR).is_ok());
        assert!(!Status::from_raw(IM_STATUS_FAILED).is_ok());
        assert!(!Status::from_raw(IM_STATUS_INVALID_PARAM).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Status {
            operation: "improcess",
            status: Status::InvalidParam,
            detail: "src width is zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "improcess failed: invalid parameter (src width is zero)"
        );

        let err = Error::Unsupported {
            feature: "job API",
            required: Version::new(1, 9, 0),
        };
        assert_eq!(err.to_string(), "job API requires librga 1.9.0 or newer");
    }
}
