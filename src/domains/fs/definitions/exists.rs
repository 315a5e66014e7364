//! Existence probes.
//!
//! A probe never fails: a path outside the root is reported as absent, the
//! same answer a missing path gets.

use crate::domains::fs::{Operation, SafeFs};

impl SafeFs {
    pub fn exists_sync(&self, path: &str) -> bool {
        match self.guard_probe(Operation::Exists, path) {
            Some(resolved) => resolved.exists(),
            None => false,
        }
    }

    pub async fn exists(&self, path: &str) -> bool {
        match self.guard_probe(Operation::Exists, path) {
            Some(resolved) => tokio::fs::try_exists(resolved).await.unwrap_or(false),
            None => false,
        }
    }
}
