//! Cache entry state and the subscriber-facing query handle.
//!
//! Each cache entry broadcasts its state through a watch channel; a
//! [`QueryHandle`] is one subscription to that channel, typed with the
//! payload the fetcher produces. Dropping the handle unsubscribes.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::query::cache::QueryCache;
use crate::query::key::QueryKey;
use crate::transport::TransportError;

/// Type-erased successful payload held by a cache entry.
pub type ErasedData = Arc<dyn Any + Send + Sync>;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No fetch has been started (entry disabled or just created).
    Idle,
    /// A fetch is running and there is no prior data to show.
    Loading,
    /// The entry holds the payload of the last applied fetch.
    Success,
    /// The last applied fetch failed; prior data, if any, is retained.
    Error,
}

/// Point-in-time state of a cache entry, as broadcast to subscribers.
#[derive(Clone)]
pub struct EntrySnapshot {
    pub status: QueryStatus,
    pub data: Option<ErasedData>,
    pub error: Option<Arc<TransportError>>,
    pub is_stale: bool,
    pub last_fetched_at: Option<Instant>,
}

impl EntrySnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_stale: false,
            last_fetched_at: None,
        }
    }

    /// Whether a successful payload is still fresh under `stale_time`.
    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        self.status == QueryStatus::Success
            && !self.is_stale
            && self
                .last_fetched_at
                .is_some_and(|at| at.elapsed() < stale_time)
    }
}

impl fmt::Debug for EntrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntrySnapshot")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("is_stale", &self.is_stale)
            .finish()
    }
}

/// Per-subscription behavior knobs.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// How long a successful payload counts as fresh. Zero (the default)
    /// means any new subscription triggers a background refetch.
    pub stale_time: Duration,
    /// Force a refetch on every new subscription, fresh or not.
    pub refetch_on_mount: bool,
    /// When false, suppress fetching entirely (e.g. an id is not yet known).
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            refetch_on_mount: false,
            enabled: true,
        }
    }
}

impl QueryOptions {
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn refetch_on_mount(mut self, refetch: bool) -> Self {
        self.refetch_on_mount = refetch;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Failure surfaced by [`QueryHandle::resolve`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("transport: {0}")]
    Transport(Arc<TransportError>),
    /// Not a real failure: the key is disabled or no fetch ever started.
    #[error("no cached data for this key")]
    CacheMiss,
}

/// Typed view of a snapshot for one subscriber.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<TransportError>>,
    pub is_stale: bool,
}

/// A live subscription to one cache entry.
///
/// Holds the subscriber count on the entry; dropping it releases the slot and
/// starts the entry's garbage-collection grace period once the count reaches
/// zero.
pub struct QueryHandle<T> {
    key: QueryKey,
    cache: QueryCache,
    rx: watch::Receiver<EntrySnapshot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> QueryHandle<T> {
    pub(crate) fn new(
        key: QueryKey,
        cache: QueryCache,
        rx: watch::Receiver<EntrySnapshot>,
    ) -> Self {
        Self {
            key,
            cache,
            rx,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current (status, data, error) without waiting.
    pub fn snapshot(&self) -> QueryResult<T> {
        Self::convert(self.rx.borrow().clone())
    }

    /// Stream of raw entry snapshots, one per state change.
    pub fn updates(&self) -> WatchStream<EntrySnapshot> {
        WatchStream::new(self.rx.clone())
    }

    /// Wait for the next state change. Returns false if the entry was
    /// evicted out from under the subscription.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the entry settles and return its payload.
    ///
    /// Serves cached data as soon as the entry is in `Success`, even if a
    /// background refetch is still running. A disabled or never-started
    /// entry yields [`QueryError::CacheMiss`] immediately.
    pub async fn resolve(&mut self) -> Result<Arc<T>, QueryError> {
        loop {
            let snapshot = self.rx.borrow_and_update().clone();
            match snapshot.status {
                QueryStatus::Success => {
                    return snapshot
                        .data
                        .and_then(|d| d.downcast::<T>().ok())
                        .ok_or(QueryError::CacheMiss);
                }
                QueryStatus::Error => {
                    return match snapshot.error {
                        Some(err) => Err(QueryError::Transport(err)),
                        None => Err(QueryError::CacheMiss),
                    };
                }
                QueryStatus::Idle => return Err(QueryError::CacheMiss),
                QueryStatus::Loading => {
                    if self.rx.changed().await.is_err() {
                        return Err(QueryError::CacheMiss);
                    }
                }
            }
        }
    }

    fn convert(snapshot: EntrySnapshot) -> QueryResult<T> {
        QueryResult {
            status: snapshot.status,
            data: snapshot.data.and_then(|d| d.downcast::<T>().ok()),
            error: snapshot.error,
            is_stale: snapshot.is_stale,
        }
    }
}

impl<T> Drop for QueryHandle<T> {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}
