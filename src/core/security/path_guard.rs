use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

// ============================================================================
// Working Directory
// ============================================================================

/// Base directory used to resolve relative candidate paths.
///
/// A `Fixed` directory never changes. A `Dynamic` resolver is re-evaluated on
/// every check, which lets a guard follow a directory that moves over time
/// (for example the process-wide current directory).
#[derive(Clone)]
pub enum WorkingDirectory {
    Fixed(String),
    Dynamic(Arc<dyn Fn() -> String + Send + Sync>),
}

impl WorkingDirectory {
    /// A working directory that always resolves to `dir`.
    pub fn fixed(dir: impl Into<String>) -> Self {
        Self::Fixed(dir.into())
    }

    /// A working directory computed by `resolver` at each check.
    pub fn dynamic<F>(resolver: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(resolver))
    }

    /// Tracks the process current directory.
    ///
    /// Falls back to `/` when the current directory cannot be read (it was
    /// removed, or permissions changed underneath the process).
    pub fn current() -> Self {
        Self::dynamic(|| process_current_dir().to_string_lossy().into_owned())
    }

    /// Evaluate the resolver.
    pub fn get(&self) -> String {
        match self {
            Self::Fixed(dir) => dir.clone(),
            Self::Dynamic(resolver) => resolver(),
        }
    }
}

impl fmt::Debug for WorkingDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(dir) => f.debug_tuple("Fixed").field(dir).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&self.get()).finish(),
        }
    }
}

impl From<&str> for WorkingDirectory {
    fn from(dir: &str) -> Self {
        Self::fixed(dir)
    }
}

impl From<String> for WorkingDirectory {
    fn from(dir: String) -> Self {
        Self::Fixed(dir)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Raised when a candidate path resolves outside the root limit.
///
/// The display form is `EACCES, permission denied '<path>'`, where `<path>`
/// is the candidate exactly as the caller supplied it. Callers match on this
/// string, so it must not change.
#[derive(Debug, Clone, thiserror::Error)]
#[error("EACCES, permission denied '{path}'")]
pub struct AccessDenied {
    path: String,
    root_limit: String,
    working_directory: WorkingDirectory,
}

impl AccessDenied {
    /// POSIX-style error code.
    pub const CODE: &'static str = "EACCES";

    /// Numeric errno reported alongside [`Self::CODE`].
    pub const ERRNO: i32 = 3;

    /// The unresolved candidate path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The normalized root limit in effect (always ends with `/`).
    pub fn root_limit(&self) -> &str {
        &self.root_limit
    }

    /// The working-directory resolver in effect when the check ran.
    pub fn working_directory(&self) -> &WorkingDirectory {
        &self.working_directory
    }

    pub fn code(&self) -> &'static str {
        Self::CODE
    }

    pub fn errno(&self) -> i32 {
        Self::ERRNO
    }
}

// ============================================================================
// Guard
// ============================================================================

/// Options accepted by [`PathGuard::new`].
#[derive(Debug, Clone)]
pub struct GuardOptions {
    /// Base directory for relative paths.
    pub working_directory: WorkingDirectory,

    /// Directory boundary. Defaults to the working directory's value at
    /// construction time.
    pub root_limit: Option<String>,
}

impl GuardOptions {
    pub fn new(working_directory: impl Into<WorkingDirectory>) -> Self {
        Self {
            working_directory: working_directory.into(),
            root_limit: None,
        }
    }

    pub fn with_root_limit(mut self, root_limit: impl Into<String>) -> Self {
        self.root_limit = Some(root_limit.into());
        self
    }
}

/// Outcome of a single containment check.
///
/// On success `path` holds the resolved absolute path and `error` is `None`.
/// On failure `path` is the candidate as supplied and `error` explains why.
#[derive(Debug, Clone)]
pub struct PathCheck {
    pub path: String,
    pub error: Option<AccessDenied>,
}

impl PathCheck {
    pub fn is_allowed(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<PathBuf, AccessDenied> {
        match self.error {
            None => Ok(PathBuf::from(self.path)),
            Some(error) => Err(error),
        }
    }
}

/// Decides whether candidate paths lie under a fixed root directory.
///
/// The root limit is normalized once, at construction, to end with exactly
/// one `/`. Containment is then a plain string prefix test on the lexically
/// resolved candidate, so `/home/foo-bar` is never inside `/home/foo`.
/// Symlinks are not followed: only the literal resolved path is compared.
#[derive(Debug, Clone)]
pub struct PathGuard {
    working_directory: WorkingDirectory,
    root_limit: String,
}

impl PathGuard {
    pub fn new(options: GuardOptions) -> Self {
        let GuardOptions {
            working_directory,
            root_limit,
        } = options;
        // an empty root limit means "unset", never "/"
        let root_limit = root_limit
            .filter(|root| !root.is_empty())
            .unwrap_or_else(|| working_directory.get());

        Self {
            root_limit: normalize_root_limit(&root_limit),
            working_directory,
        }
    }

    /// The normalized root limit, always ending with `/`.
    pub fn root_limit(&self) -> &str {
        &self.root_limit
    }

    pub fn working_directory(&self) -> &WorkingDirectory {
        &self.working_directory
    }

    /// Resolve `candidate` against the working directory and test it against
    /// the root limit.
    pub fn check(&self, candidate: &str) -> PathCheck {
        let resolved = resolve_path(&self.working_directory.get(), candidate)
            .to_string_lossy()
            .into_owned();
        let allowed = is_within_root(&resolved, &self.root_limit);

        debug!(candidate, resolved = %resolved, allowed, "path check");

        if allowed {
            PathCheck {
                path: resolved,
                error: None,
            }
        } else {
            PathCheck {
                path: candidate.to_string(),
                error: Some(AccessDenied {
                    path: candidate.to_string(),
                    root_limit: self.root_limit.clone(),
                    working_directory: self.working_directory.clone(),
                }),
            }
        }
    }

    /// `Result`-shaped form of [`Self::check`].
    pub fn resolve(&self, candidate: &str) -> Result<PathBuf, AccessDenied> {
        self.check(candidate).into_result()
    }

    pub fn is_allowed(&self, candidate: &str) -> bool {
        self.check(candidate).is_allowed()
    }
}

/// Strip every trailing `/` and append exactly one.
fn normalize_root_limit(root: &str) -> String {
    format!("{}/", root.trim_end_matches('/'))
}

fn process_current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"))
}

fn is_within_root(resolved: &str, root_limit: &str) -> bool {
    resolved.starts_with(root_limit)
}

/// Lexically resolve `candidate` against `base` into an absolute path.
///
/// Absolute candidates ignore `base`, and a relative `base` is itself taken
/// relative to the process current directory. `.` segments vanish, `..` pops
/// one segment and never climbs above `/`, and repeated or trailing
/// separators collapse. Nothing else on disk is consulted.
pub fn resolve_path(base: &str, candidate: &str) -> PathBuf {
    let base = Path::new(base);
    let anchor = if base.is_absolute() {
        PathBuf::from("/")
    } else {
        process_current_dir()
    };
    let joined = anchor.join(base).join(candidate);

    let mut stack = Vec::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                stack.pop();
            }
            Component::Normal(c) => stack.push(c),
            Component::RootDir => {
                stack.clear();
            }
            Component::Prefix(_) => {}
        }
    }

    let mut result = PathBuf::from("/");
    for c in stack {
        result.push(c);
    }
    result
}
