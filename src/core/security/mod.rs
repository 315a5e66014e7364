// Security module for root-directory containment
//
// This module decides whether a caller-supplied path stays inside the
// configured root limit, before any filesystem primitive sees it.

pub mod path_guard;

pub use path_guard::{
    AccessDenied, GuardOptions, PathCheck, PathGuard, WorkingDirectory, resolve_path,
};
