//! Client-side data synchronization: keys, cache, and mutations.
//!
//! - [`key`]: hierarchical structural keys and prefix matching
//! - [`entry`]: entry state, subscription options, the typed query handle
//! - [`cache`]: the query cache (dedup, staleness, ordering, GC)
//! - [`mutation`]: write operations with declared invalidation sets

pub mod cache;
pub mod entry;
pub mod key;
pub mod mutation;

pub use cache::{CacheConfig, QueryCache};
pub use entry::{
    EntrySnapshot, QueryError, QueryHandle, QueryOptions, QueryResult, QueryStatus,
};
pub use key::{params_record, ParamRecord, ParamValue, QueryKey, Segment};
pub use mutation::{Mutation, MutationState};
