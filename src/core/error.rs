//! Error types for the reproducers
//!
//! Library-level failures are kept apart from "the library returned a
//! negative status", because the latter is an observation a reproducer
//! reports through its exit status rather than a reason to abort.

use thiserror::Error;

/// Main error type for libudev access
#[derive(Error, Debug)]
pub enum ReproError {
    /// None of the candidate shared objects could be loaded
    #[error("libudev could not be loaded (tried {tried}): {reason}")]
    LibraryNotFound { tried: String, reason: String },

    /// The library loaded but lacks an entry point we call
    #[error("libudev symbol '{name}' is missing: {reason}")]
    MissingSymbol { name: String, reason: String },

    /// `udev_new()` returned NULL
    #[error("udev_new() did not return a context")]
    ContextUnavailable,

    /// An argument could not be handed to C (interior NUL byte)
    #[error("invalid argument for {call}: {message}")]
    InvalidArgument { call: &'static str, message: String },

    /// A libudev call returned a negative errno
    #[error("{call} returned {code}")]
    Status { call: &'static str, code: i32 },

    /// General I/O error
    #[error("IO error: {0}")]
    IoError(String),
}

impl ReproError {
    /// The negative status a library call returned, if that is what failed
    pub fn status_code(&self) -> Option<i32> {
        match self {
            ReproError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Name of the libudev call that failed, where known
    pub fn failed_call(&self) -> Option<&'static str> {
        match self {
            ReproError::Status { call, .. } | ReproError::InvalidArgument { call, .. } => {
                Some(call)
            }
            _ => None,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ReproError>;

impl From<std::io::Error> for ReproError {
    fn from(err: std::io::Error) -> Self {
        ReproError::IoError(err.to_string())
    }
}

/// Map a libudev status return to `Ok(code)` or `ReproError::Status`
pub fn check_status(call: &'static str, code: i32) -> Result<i32> {
    if code < 0 {
        Err(ReproError::Status { call, code })
    } else {
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_passes_non_negative() {
        assert_eq!(check_status("udev_enumerate_scan_devices", 0).unwrap(), 0);
        assert_eq!(check_status("udev_enumerate_scan_devices", 7).unwrap(), 7);
    }

    #[test]
    fn test_check_status_keeps_negative_errno() {
        let err = check_status("udev_enumerate_add_match_parent", -22).unwrap_err();
        assert_eq!(err.status_code(), Some(-22));
        assert_eq!(err.failed_call(), Some("udev_enumerate_add_match_parent"));
        assert_eq!(
            err.to_string(),
            "udev_enumerate_add_match_parent returned -22"
        );
    }

    #[test]
    fn test_non_status_errors_have_no_code() {
        let err = ReproError::ContextUnavailable;
        assert_eq!(err.status_code(), None);
        assert_eq!(err.failed_call(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ReproError = io.into();
        assert!(matches!(err, ReproError::IoError(ref m) if m.contains("gone")));
    }
}
