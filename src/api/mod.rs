//! Typed API surface of the review service.
//!
//! - [`types`]: entity types shared across resources
//! - [`repos`]: repository management (the full read/write surface)
//! - [`reviews`]: review history (read-only)
//! - [`feedbacks`]: false-positive feedback and aggregate stats (read-only)

pub mod feedbacks;
pub mod repos;
pub mod reviews;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::query::{CacheConfig, QueryCache};
use crate::transport::{Notifier, Transport, TransportError};

use feedbacks::{FeedbacksApi, FeedbacksClient};
use repos::{ReposApi, ReposClient};
use reviews::{ReviewsApi, ReviewsClient};

/// The assembled console client: one transport, one cache, one notifier,
/// and the per-resource query/mutation surfaces on top.
pub struct Console {
    pub repos: ReposClient,
    pub reviews: ReviewsClient,
    pub feedbacks: FeedbacksClient,
    cache: QueryCache,
}

impl Console {
    pub fn new(config: &Config, notifier: Notifier) -> Result<Self, TransportError> {
        let transport = Arc::new(Transport::new(
            &config.http.base_url,
            Duration::from_secs(config.http.timeout_secs),
            notifier.clone(),
        )?);
        let cache = QueryCache::new(CacheConfig {
            gc_grace: Duration::from_secs(config.cache.gc_grace_secs),
        });

        Ok(Self {
            repos: ReposClient::new(ReposApi::new(transport.clone()), cache.clone(), notifier),
            reviews: ReviewsClient::new(ReviewsApi::new(transport.clone()), cache.clone()),
            feedbacks: FeedbacksClient::new(FeedbacksApi::new(transport), cache.clone()),
            cache,
        })
    }

    /// The shared query cache, for invalidation and inspection.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }
}
