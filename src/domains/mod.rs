//! Domains module containing the facade and the machinery behind it.
//!
//! - **fs**: the [`fs::SafeFs`] facade and its operation table
//! - **streams**: read and write streams with deferred errors
//! - **watchers**: native watches and polling stat watchers

pub mod fs;
pub mod streams;
pub mod watchers;
