//! Review history: read-only endpoints, keys, and queries.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::api::types::{Paginated, Review};
use crate::query::{params_record, QueryCache, QueryHandle, QueryKey, QueryOptions};
use crate::transport::{Transport, TransportError};

/// Filters for `GET /reviews`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Key builders for the `reviews` namespace.
pub mod review_keys {
    use super::*;

    /// Invalidation prefix covering every `reviews` entry.
    pub fn all() -> QueryKey {
        QueryKey::prefix(&["reviews"])
    }

    pub fn lists() -> QueryKey {
        QueryKey::prefix(&["reviews", "list"])
    }

    pub fn list(params: &ReviewListParams) -> QueryKey {
        lists().with_params(params_record(params))
    }

    pub fn detail(id: i64) -> QueryKey {
        QueryKey::detail("reviews", id)
    }
}

/// Raw endpoint calls for the `reviews` resource.
#[derive(Debug, Clone)]
pub struct ReviewsApi {
    transport: Arc<Transport>,
}

impl ReviewsApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        params: &ReviewListParams,
    ) -> Result<Paginated<Review>, TransportError> {
        self.transport.get_query("/reviews", params).await
    }

    pub async fn get(&self, id: i64) -> Result<Review, TransportError> {
        self.transport.get(&format!("/reviews/{id}")).await
    }
}

/// Cache-backed queries for review history.
pub struct ReviewsClient {
    api: ReviewsApi,
    cache: QueryCache,
}

impl ReviewsClient {
    pub fn new(api: ReviewsApi, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    /// Review history is volatile, so list subscriptions always refetch on
    /// mount rather than trusting a cached page.
    pub fn list(&self, params: ReviewListParams) -> QueryHandle<Paginated<Review>> {
        let api = self.api.clone();
        let key = review_keys::list(&params);
        self.cache.subscribe(
            key,
            move || {
                let api = api.clone();
                let params = params.clone();
                async move { api.list(&params).await }
            },
            QueryOptions::default()
                .stale_time(Duration::ZERO)
                .refetch_on_mount(true),
        )
    }

    pub fn detail(&self, id: i64) -> QueryHandle<Review> {
        let api = self.api.clone();
        self.cache.subscribe(
            review_keys::detail(id),
            move || {
                let api = api.clone();
                async move { api.get(id).await }
            },
            QueryOptions::default().enabled(id != 0),
        )
    }
}
