//! Operation adapters.
//!
//! Each file holds the adapters for one shape. Every adapter guards its path
//! argument(s), substitutes the resolved path and forwards to `std::fs`
//! (the `_sync` form) or `tokio::fs` (the async form).

pub mod descriptor;
pub mod dual_path;
pub mod exists;
pub mod single_path;
pub mod stream;
pub mod watch;

use std::io;

/// Run a blocking primitive that has no `tokio::fs` counterpart.
pub(crate) async fn blocking<F, T>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(join_error) => Err(io::Error::other(join_error)),
    }
}
