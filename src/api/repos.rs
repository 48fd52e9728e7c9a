//! Repository management: endpoints, keys, queries, and mutations.
//!
//! This is the one resource with a full write surface. The invalidation
//! policy per operation:
//!
//! | operation      | on success, invalidate                      |
//! |----------------|---------------------------------------------|
//! | create         | all `repos/list` keys (any filter)          |
//! | update         | all `repos/list` keys; `repos/detail/{id}`  |
//! | delete         | all `repos/list` keys                       |
//! | toggle enabled | all `repos/list` keys                       |

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::types::{Paginated, Repo, RepoConfig, TemplateList};
use crate::query::{
    params_record, Mutation, QueryCache, QueryHandle, QueryKey, QueryOptions,
};
use crate::transport::{Notifier, Transport, TransportError};

/// Filters for `GET /repos`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Body of `POST /repos`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepoRequest {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RepoConfig>,
}

/// Body of `PUT /repos/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateRepoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<RepoConfig>,
}

/// Create result: the repo plus whether a previously soft-deleted repository
/// was reactivated instead of newly created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedRepo {
    #[serde(flatten)]
    pub repo: Repo,
    #[serde(default)]
    pub restored: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ToggleBody {
    enabled: bool,
}

/// Input for the update mutation.
#[derive(Debug, Clone)]
pub struct UpdateRepoInput {
    pub id: i64,
    pub request: UpdateRepoRequest,
}

/// Input for the toggle mutation.
#[derive(Debug, Clone)]
pub struct ToggleRepoInput {
    pub id: i64,
    pub enabled: bool,
}

/// Key builders for the `repos` namespace.
///
/// The parameterless builders double as invalidation prefixes: invalidating
/// [`all`] refreshes the whole namespace, [`lists`] every list page,
/// [`details`] every detail entry.
pub mod repo_keys {
    use super::*;

    pub fn all() -> QueryKey {
        QueryKey::prefix(&["repos"])
    }

    pub fn lists() -> QueryKey {
        QueryKey::prefix(&["repos", "list"])
    }

    pub fn list(params: &RepoListParams) -> QueryKey {
        lists().with_params(params_record(params))
    }

    pub fn details() -> QueryKey {
        QueryKey::prefix(&["repos", "detail"])
    }

    pub fn detail(id: i64) -> QueryKey {
        details().with_id(id)
    }

    pub fn templates() -> QueryKey {
        QueryKey::templates("repos")
    }
}

/// Raw endpoint calls for the `repos` resource.
#[derive(Debug, Clone)]
pub struct ReposApi {
    transport: Arc<Transport>,
}

impl ReposApi {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self, params: &RepoListParams) -> Result<Paginated<Repo>, TransportError> {
        self.transport.get_query("/repos", params).await
    }

    pub async fn get(&self, id: i64) -> Result<Repo, TransportError> {
        self.transport.get(&format!("/repos/{id}")).await
    }

    pub async fn create(&self, request: &CreateRepoRequest) -> Result<CreatedRepo, TransportError> {
        self.transport.post("/repos", request).await
    }

    pub async fn update(
        &self,
        id: i64,
        request: &UpdateRepoRequest,
    ) -> Result<Repo, TransportError> {
        self.transport.put(&format!("/repos/{id}"), request).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TransportError> {
        self.transport.delete(&format!("/repos/{id}")).await
    }

    pub async fn toggle(&self, id: i64, enabled: bool) -> Result<Repo, TransportError> {
        self.transport
            .put(&format!("/repos/{id}/toggle"), &ToggleBody { enabled })
            .await
    }

    pub async fn templates(&self) -> Result<TemplateList, TransportError> {
        self.transport.get("/config-templates").await
    }
}

/// Cache-backed queries and mutations for repositories.
pub struct ReposClient {
    api: ReposApi,
    cache: QueryCache,
    notifier: Notifier,
}

impl ReposClient {
    pub fn new(api: ReposApi, cache: QueryCache, notifier: Notifier) -> Self {
        Self {
            api,
            cache,
            notifier,
        }
    }

    /// Subscribe to the paginated repo list for the given filters.
    pub fn list(&self, params: RepoListParams) -> QueryHandle<Paginated<Repo>> {
        let api = self.api.clone();
        let key = repo_keys::list(&params);
        self.cache.subscribe(
            key,
            move || {
                let api = api.clone();
                let params = params.clone();
                async move { api.list(&params).await }
            },
            QueryOptions::default(),
        )
    }

    /// Subscribe to a single repo. Suppressed until a real id is known.
    pub fn detail(&self, id: i64) -> QueryHandle<Repo> {
        let api = self.api.clone();
        self.cache.subscribe(
            repo_keys::detail(id),
            move || {
                let api = api.clone();
                async move { api.get(id).await }
            },
            QueryOptions::default().enabled(id != 0),
        )
    }

    /// Subscribe to the configuration preset list.
    pub fn templates(&self) -> QueryHandle<TemplateList> {
        let api = self.api.clone();
        self.cache.subscribe(
            repo_keys::templates(),
            move || {
                let api = api.clone();
                async move { api.templates().await }
            },
            QueryOptions::default(),
        )
    }

    /// Create a repository. Distinguishes the restored outcome in both the
    /// result and the success notification.
    pub fn create(&self) -> Mutation<CreateRepoRequest, CreatedRepo> {
        let api = self.api.clone();
        let notifier = self.notifier.clone();
        Mutation::new(
            self.cache.clone(),
            move |request: CreateRepoRequest| {
                let api = api.clone();
                let notifier = notifier.clone();
                async move {
                    let created = api.create(&request).await?;
                    if created.restored {
                        notifier.success("repository restored (it was previously deleted)");
                    } else {
                        notifier.success("repository created");
                    }
                    Ok(created)
                }
            },
            |_, _| vec![repo_keys::lists()],
        )
    }

    /// Update a repository's settings.
    pub fn update(&self) -> Mutation<UpdateRepoInput, Repo> {
        let api = self.api.clone();
        let notifier = self.notifier.clone();
        Mutation::new(
            self.cache.clone(),
            move |input: UpdateRepoInput| {
                let api = api.clone();
                let notifier = notifier.clone();
                async move {
                    let repo = api.update(input.id, &input.request).await?;
                    notifier.success("repository updated");
                    Ok(repo)
                }
            },
            |input, _| vec![repo_keys::lists(), repo_keys::detail(input.id)],
        )
    }

    /// Delete a repository.
    pub fn delete(&self) -> Mutation<i64, ()> {
        let api = self.api.clone();
        let notifier = self.notifier.clone();
        Mutation::new(
            self.cache.clone(),
            move |id: i64| {
                let api = api.clone();
                let notifier = notifier.clone();
                async move {
                    api.delete(id).await?;
                    notifier.success("repository deleted");
                    Ok(())
                }
            },
            |_, _| vec![repo_keys::lists()],
        )
    }

    /// Enable or disable reviews for a repository.
    pub fn toggle(&self) -> Mutation<ToggleRepoInput, Repo> {
        let api = self.api.clone();
        Mutation::new(
            self.cache.clone(),
            move |input: ToggleRepoInput| {
                let api = api.clone();
                async move { api.toggle(input.id, input.enabled).await }
            },
            |_, _| vec![repo_keys::lists()],
        )
    }
}
