//! Root-confined filesystem access.
//!
//! This crate wraps the native filesystem so that every path argument is
//! resolved against a working directory and rejected unless it lands under a
//! configured root.
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, and the [`PathGuard`]
//! - **domains**: The facade and its supporting pieces
//!   - **fs**: [`SafeFs`] and the static operation table
//!   - **streams**: Read and write streams that report failure as events
//!   - **watchers**: `watch` and `watch_file` backends
//!
//! # Example
//!
//! ```rust,no_run
//! use safe_fs::GuardOptions;
//!
//! let fs = safe_fs::create(GuardOptions::new("/sandbox"));
//! fs.write_file_sync("notes.txt", "hello")?;
//! assert!(fs.read_file_sync("../etc/passwd").is_err());
//! # Ok::<(), safe_fs::FsError>(())
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use crate::core::{
    AccessDenied, Config, ConfigError, FsError, GuardOptions, PathCheck, PathGuard, Result,
    WorkingDirectory,
};
pub use crate::domains::fs::{Operation, SafeFs, Shape};
pub use crate::domains::streams::{
    ReadStream, ReadStreamOptions, StreamEvent, WriteStream, WriteStreamOptions,
};
#[cfg(feature = "watch")]
pub use crate::domains::watchers::{FsWatcher, WatchEvent, WatchEventKind};
pub use crate::domains::watchers::{ListenerId, StatListener, StatSnapshot};

/// Build a facade confined to `options.root_limit`, which defaults to the
/// working directory.
pub fn create(options: GuardOptions) -> SafeFs {
    SafeFs::create(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_root_to_working_directory() {
        let fs = create(GuardOptions::new("/sandbox"));
        assert_eq!(fs.guard().root_limit(), "/sandbox/");
        assert_eq!(
            fs.check("./a.txt").into_result().unwrap(),
            std::path::PathBuf::from("/sandbox/a.txt")
        );
        assert_eq!(
            fs.check("../etc/passwd").error.unwrap().to_string(),
            "EACCES, permission denied '../etc/passwd'"
        );
    }
}
