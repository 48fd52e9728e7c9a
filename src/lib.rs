//! review-console: data-synchronization client for the code-review console.
//!
//! Turns declarative data requirements into deduplicated network requests and
//! keeps a local cache of server-owned entities consistent across reads and
//! writes issued from different parts of the UI:
//!
//! - [`transport`]: HTTP client, envelope unwrapping, failure classification
//! - [`query`]: structural keys, the query cache, the mutation executor
//! - [`api`]: typed endpoints, key builders, and queries per resource
//! - [`config`]: runtime configuration and the CLI surface

pub mod api;
pub mod config;
pub mod query;
pub mod transport;
