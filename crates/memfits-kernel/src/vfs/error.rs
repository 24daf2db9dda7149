//! VFS error types.

use std::io;

use rustix::io::Errno;
use thiserror::Error;

use crate::fits::FitsError;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Filesystem is read-only.
    #[error("filesystem is read-only")]
    ReadOnly,

    /// Path escapes root (security violation).
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The operation would modify the synthetic image.
    #[error("{op} not supported on synthetic entry: {path}")]
    NotSupportedOnSynthetic { op: &'static str, path: String },

    /// No open file carries this handle.
    #[error("bad file handle: {0}")]
    BadHandle(u64),

    /// Rendering the synthetic image failed.
    #[error("synthetic image: {0}")]
    Fits(#[from] FitsError),

    /// I/O error from the backing store, passed through untouched.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NotSupportedOnSynthetic error.
    pub fn synthetic(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotSupportedOnSynthetic {
            op,
            path: path.into(),
        }
    }

    /// The errno a callback transport should hand back to the kernel.
    ///
    /// Backing-store failures keep their original OS error code.
    pub fn errno(&self) -> i32 {
        let errno = match self {
            VfsError::PermissionDenied(_) | VfsError::PathEscapesRoot(_) => Errno::ACCESS,
            VfsError::ReadOnly | VfsError::NotSupportedOnSynthetic { .. } => Errno::ROFS,
            VfsError::InvalidPath(_) => Errno::INVAL,
            VfsError::BadHandle(_) => Errno::BADF,
            VfsError::Fits(_) => Errno::IO,
            VfsError::Io(e) => match e.raw_os_error() {
                Some(code) => return code,
                None => Errno::IO,
            },
        };
        errno.raw_os_error()
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
