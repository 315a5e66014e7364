//! Streams domain module.
//!
//! Read and write streams run on a spawned Tokio task and report progress as
//! [`StreamEvent`]s. Construction never fails: a denied path yields a stream
//! whose first event is the error.

mod events;
pub mod read;
pub mod write;

pub use events::StreamEvent;
pub use read::{DEFAULT_HIGH_WATER_MARK, ReadStream, ReadStreamOptions};
pub use write::{WriteStream, WriteStreamOptions};
