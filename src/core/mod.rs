//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the facade:
//! error handling, configuration, and the path guard that every operation
//! runs through.

pub mod config;
pub mod error;
pub mod security;

pub use config::Config;
pub use error::{ConfigError, FsError, Result};
pub use security::{AccessDenied, GuardOptions, PathCheck, PathGuard, WorkingDirectory};
