//! Operation Registry - the static table of every forwarded operation.
//!
//! This module provides:
//! - The list of all operations the facade exposes
//! - The shape of each operation, which fixes how a guard failure is reported
//! - The per-shape guard helpers every adapter goes through

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, instrument, warn};

use super::SafeFs;
use crate::core::error::Result;
use crate::core::security::AccessDenied;

// ============================================================================
// Shapes
// ============================================================================

/// Calling convention of an operation, which decides how a denial surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// One path argument. Async forms resolve to `Err`, sync forms return it.
    Single,
    /// Existence probe. A denial reads as "does not exist".
    Exists,
    /// Two path arguments, both checked. The first denial wins.
    Dual,
    /// Returns a stream at once; a denial arrives later as an error event.
    Stream,
    /// Watch registration. A denial is returned synchronously.
    Watch,
    /// Acts on an open handle. Never checked.
    Descriptor,
}

// ============================================================================
// Operations
// ============================================================================

/// Every operation the facade forwards to the native filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Truncate,
    Chown,
    Lchown,
    Chmod,
    Stat,
    Lstat,
    Readlink,
    Realpath,
    Unlink,
    Rmdir,
    Mkdir,
    Readdir,
    Open,
    Utimes,
    ReadFile,
    WriteFile,
    AppendFile,
    Exists,
    Rename,
    Link,
    Symlink,
    CreateReadStream,
    CreateWriteStream,
    Watch,
    WatchFile,
    UnwatchFile,
    Fchown,
    Fchmod,
    Fstat,
    Close,
    Futimes,
    Fsync,
    Read,
    Write,
    Ftruncate,
}

impl Operation {
    /// All operations, in registration order.
    pub const ALL: [Operation; 35] = [
        Operation::Truncate,
        Operation::Chown,
        Operation::Lchown,
        Operation::Chmod,
        Operation::Stat,
        Operation::Lstat,
        Operation::Readlink,
        Operation::Realpath,
        Operation::Unlink,
        Operation::Rmdir,
        Operation::Mkdir,
        Operation::Readdir,
        Operation::Open,
        Operation::Utimes,
        Operation::ReadFile,
        Operation::WriteFile,
        Operation::AppendFile,
        Operation::Exists,
        Operation::Rename,
        Operation::Link,
        Operation::Symlink,
        Operation::CreateReadStream,
        Operation::CreateWriteStream,
        Operation::Watch,
        Operation::WatchFile,
        Operation::UnwatchFile,
        Operation::Fchown,
        Operation::Fchmod,
        Operation::Fstat,
        Operation::Close,
        Operation::Futimes,
        Operation::Fsync,
        Operation::Read,
        Operation::Write,
        Operation::Ftruncate,
    ];

    /// Method name of the async (or only) form on [`SafeFs`].
    pub const fn name(self) -> &'static str {
        match self {
            Operation::Truncate => "truncate",
            Operation::Chown => "chown",
            Operation::Lchown => "lchown",
            Operation::Chmod => "chmod",
            Operation::Stat => "stat",
            Operation::Lstat => "lstat",
            Operation::Readlink => "readlink",
            Operation::Realpath => "realpath",
            Operation::Unlink => "unlink",
            Operation::Rmdir => "rmdir",
            Operation::Mkdir => "mkdir",
            Operation::Readdir => "readdir",
            Operation::Open => "open",
            Operation::Utimes => "utimes",
            Operation::ReadFile => "read_file",
            Operation::WriteFile => "write_file",
            Operation::AppendFile => "append_file",
            Operation::Exists => "exists",
            Operation::Rename => "rename",
            Operation::Link => "link",
            Operation::Symlink => "symlink",
            Operation::CreateReadStream => "create_read_stream",
            Operation::CreateWriteStream => "create_write_stream",
            Operation::Watch => "watch",
            Operation::WatchFile => "watch_file",
            Operation::UnwatchFile => "unwatch_file",
            Operation::Fchown => "fchown",
            Operation::Fchmod => "fchmod",
            Operation::Fstat => "fstat",
            Operation::Close => "close",
            Operation::Futimes => "futimes",
            Operation::Fsync => "fsync",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Ftruncate => "ftruncate",
        }
    }

    pub const fn shape(self) -> Shape {
        match self {
            Operation::Truncate
            | Operation::Chown
            | Operation::Lchown
            | Operation::Chmod
            | Operation::Stat
            | Operation::Lstat
            | Operation::Readlink
            | Operation::Realpath
            | Operation::Unlink
            | Operation::Rmdir
            | Operation::Mkdir
            | Operation::Readdir
            | Operation::Open
            | Operation::Utimes
            | Operation::ReadFile
            | Operation::WriteFile
            | Operation::AppendFile => Shape::Single,
            Operation::Exists => Shape::Exists,
            Operation::Rename | Operation::Link | Operation::Symlink => Shape::Dual,
            Operation::CreateReadStream | Operation::CreateWriteStream => Shape::Stream,
            Operation::Watch | Operation::WatchFile | Operation::UnwatchFile => Shape::Watch,
            Operation::Fchown
            | Operation::Fchmod
            | Operation::Fstat
            | Operation::Close
            | Operation::Futimes
            | Operation::Fsync
            | Operation::Read
            | Operation::Write
            | Operation::Ftruncate => Shape::Descriptor,
        }
    }

    /// Whether a blocking `<name>_sync` form exists alongside the async one.
    pub const fn has_sync_form(self) -> bool {
        !matches!(self.shape(), Shape::Stream | Shape::Watch)
    }

    /// Number of path arguments the guard checks.
    pub const fn path_arity(self) -> usize {
        match self.shape() {
            Shape::Dual => 2,
            Shape::Descriptor => 0,
            _ => 1,
        }
    }

    /// Look up an operation by the name of either of its forms.
    pub fn from_name(name: &str) -> Option<Self> {
        let base = name.strip_suffix("_sync").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|op| op.name() == base && (base == name || op.has_sync_form()))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Shape helpers
// ============================================================================

impl SafeFs {
    /// Guard the single path argument of a `Single` or `Watch` operation.
    #[instrument(level = "trace", skip_all, fields(operation = %op, path = %path))]
    pub(crate) fn guard_path(&self, op: Operation, path: &str) -> Result<PathBuf> {
        debug_assert!(matches!(op.shape(), Shape::Single | Shape::Watch));
        self.guard().resolve(path).map_err(|denied| {
            warn!(operation = %op, "{}", denied);
            denied.into()
        })
    }

    /// Guard both path arguments of a `Dual` operation.
    ///
    /// Both paths are always checked; when both are denied the first one is
    /// reported.
    #[instrument(level = "trace", skip_all, fields(operation = %op, first = %first, second = %second))]
    pub(crate) fn guard_pair(
        &self,
        op: Operation,
        first: &str,
        second: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        debug_assert_eq!(op.shape(), Shape::Dual);
        let first = self.guard().resolve(first);
        let second = self.guard().resolve(second);

        match (first, second) {
            (Ok(first), Ok(second)) => Ok((first, second)),
            (Err(denied), _) | (_, Err(denied)) => {
                warn!(operation = %op, "{}", denied);
                Err(denied.into())
            }
        }
    }

    /// Guard an existence probe. A denial becomes `None`, never an error.
    pub(crate) fn guard_probe(&self, op: Operation, path: &str) -> Option<PathBuf> {
        debug_assert_eq!(op.shape(), Shape::Exists);
        match self.guard().resolve(path) {
            Ok(resolved) => Some(resolved),
            Err(denied) => {
                debug!(operation = %op, "{}; reporting as absent", denied);
                None
            }
        }
    }

    /// Guard the path of a `Stream` operation. The caller turns a denial into
    /// a deferred error event.
    pub(crate) fn guard_stream(
        &self,
        op: Operation,
        path: &str,
    ) -> std::result::Result<PathBuf, AccessDenied> {
        debug_assert_eq!(op.shape(), Shape::Stream);
        self.guard().resolve(path).inspect_err(|denied| {
            warn!(operation = %op, "{}; deferring error event", denied);
        })
    }
}
