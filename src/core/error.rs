//! Error types and handling for the filesystem facade.
//!
//! The facade introduces exactly one new failure, [`AccessDenied`], raised
//! before any native call is attempted. Everything else is the native error,
//! passed through untouched.

use std::io;

use thiserror::Error;

use super::security::AccessDenied;

/// A specialized Result type for facade operations.
pub type Result<T> = std::result::Result<T, FsError>;

/// Unified error type for facade operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The path resolved outside the root limit.
    #[error(transparent)]
    PermissionDenied(#[from] AccessDenied),

    /// Native filesystem error, unaltered.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Native change-notification backend error, unaltered.
    #[cfg(feature = "watch")]
    #[error(transparent)]
    Watch(#[from] notify::Error),
}

impl FsError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// The denial, if this error came from the path guard.
    pub fn access_denied(&self) -> Option<&AccessDenied> {
        match self {
            Self::PermissionDenied(denied) => Some(denied),
            _ => None,
        }
    }

    /// POSIX-style code (`EACCES`, `ENOENT`, ...) when one can be named.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied(denied) => Some(denied.code()),
            Self::Io(err) => io_error_code(err),
            #[cfg(feature = "watch")]
            Self::Watch(err) => match &err.kind {
                notify::ErrorKind::Io(err) => io_error_code(err),
                notify::ErrorKind::PathNotFound => Some("ENOENT"),
                _ => None,
            },
        }
    }

    /// Numeric errno: `3` for guard denials, the raw OS error otherwise.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::PermissionDenied(denied) => Some(denied.errno()),
            Self::Io(err) => err.raw_os_error(),
            #[cfg(feature = "watch")]
            Self::Watch(err) => match &err.kind {
                notify::ErrorKind::Io(err) => err.raw_os_error(),
                _ => None,
            },
        }
    }
}

fn io_error_code(err: &io::Error) -> Option<&'static str> {
    match err.kind() {
        io::ErrorKind::NotFound => Some("ENOENT"),
        io::ErrorKind::PermissionDenied => Some("EACCES"),
        io::ErrorKind::AlreadyExists => Some("EEXIST"),
        io::ErrorKind::NotADirectory => Some("ENOTDIR"),
        io::ErrorKind::IsADirectory => Some("EISDIR"),
        io::ErrorKind::DirectoryNotEmpty => Some("ENOTEMPTY"),
        io::ErrorKind::InvalidInput => Some("EINVAL"),
        io::ErrorKind::CrossesDevices => Some("EXDEV"),
        _ => None,
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        match err {
            FsError::PermissionDenied(denied) => {
                io::Error::new(io::ErrorKind::PermissionDenied, denied)
            }
            FsError::Io(err) => err,
            #[cfg(feature = "watch")]
            FsError::Watch(err) => match err.kind {
                notify::ErrorKind::Io(err) => err,
                _ => io::Error::other(err),
            },
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for [`crate::core::Config`].
    #[error("Invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// An individual setting could not be parsed.
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}
