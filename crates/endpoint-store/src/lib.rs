//! Endpoint subscription records.
//!
//! Records carry a TTL; the in-memory store publishes every create, update
//! and delete (including TTL purges) on a change feed that the reconciler
//! consumes. The feed applies backpressure instead of dropping changes.

mod error;
mod feed;
mod store;
mod types;

pub use error::StoreError;
pub use feed::ChangeFeed;
pub use store::{MemoryRecordStore, RecordStore, FEED_CAPACITY};
pub use types::*;
