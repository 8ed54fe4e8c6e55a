//! Keyed query cache with invalidation and in-flight de-duplication.
//!
//! The cache holds fetched pages per query key. Guarantees:
//! - at most one fetch per key is in flight at a time; concurrent
//!   consumers share the single in-flight settlement
//! - entering a mutation cancels the key's pending fetch, so a stale
//!   response never clobbers an optimistic write
//! - invalidation marks an entry stale, forcing the next read-side sync
//!   to refetch

mod key;
mod store;

pub use key::QueryKey;
pub use store::{QueryCache, WriteMode};
