//! False-positive feedback: read-only endpoints, keys, and queries.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::api::types::{Feedback, FeedbackStats, Paginated};
use crate::query::{params_record, QueryCache, QueryHandle, QueryKey, QueryOptions};
use crate::transport::{Transport, TransportError};

/// Filters for `GET /feedbacks`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedbackListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Filters for `GET /feedbacks/stats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedbackStatsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Key builders for the `feedbacks` namespace.
pub mod feedback_keys {
    use super::*;

    /// Invalidation prefix covering every `feedbacks` entry.
    pub fn all() -> QueryKey {
        QueryKey::prefix(&["feedbacks"])
    }

    pub fn lists() -> QueryKey {
        QueryKey::prefix(&["feedbacks", "list"])
    }

    pub fn list(params: &FeedbackListParams) -> QueryKey {
        lists().with_params(params_record(params))
    }

    pub fn stats(params: &FeedbackStatsParams) -> QueryKey {
        QueryKey::stats("feedbacks", params_record(params))
    }
}

/// Raw endpoint calls for the `feedbacks` resource.
#[derive(Debug, Clone)]
pub struct FeedbacksApi {
    transport: Arc<Transport>,
}

impl FeedbacksApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        params: &FeedbackListParams,
    ) -> Result<Paginated<Feedback>, TransportError> {
        self.transport.get_query("/feedbacks", params).await
    }

    pub async fn stats(
        &self,
        params: &FeedbackStatsParams,
    ) -> Result<FeedbackStats, TransportError> {
        self.transport.get_query("/feedbacks/stats", params).await
    }
}

/// Cache-backed queries for feedback analysis.
pub struct FeedbacksClient {
    api: FeedbacksApi,
    cache: QueryCache,
}

impl FeedbacksClient {
    pub fn new(api: FeedbacksApi, cache: QueryCache) -> Self {
        Self { api, cache }
    }

    /// Like reviews, feedback lists always refetch on mount.
    pub fn list(&self, params: FeedbackListParams) -> QueryHandle<Paginated<Feedback>> {
        let api = self.api.clone();
        let key = feedback_keys::list(&params);
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

    pub fn stats(&self, params: FeedbackStatsParams) -> QueryHandle<FeedbackStats> {
        let api = self.api.clone();
        let key = feedback_keys::stats(&params);
        self.cache.subscribe(
            key,
            move || {
                let api = api.clone();
                let params = params.clone();
                async move { api.stats(&params).await }
            },
            QueryOptions::default(),
        )
    }
}
