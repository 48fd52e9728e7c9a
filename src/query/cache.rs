//! The query cache: one entry per key, deduplicated fetches, staleness.
//!
//! The cache is the process-wide owner of all server-derived state. It
//! guarantees:
//! - at most one entry per key, at most one in-flight fetch per key;
//! - stale-while-revalidate: cached data keeps being served while a
//!   background refetch runs, and is never dropped before it resolves;
//! - "most recently started wins": each dispatched fetch carries a monotonic
//!   sequence number, and a late-arriving response from a superseded fetch is
//!   discarded instead of clobbering fresher data;
//! - entries without subscribers survive a grace period before collection,
//!   so a fast remount does not pay for a redundant fetch.
//!
//! Bookkeeping is synchronous under one mutex; the lock is never held across
//! an await. Suspension only happens at the transport boundary inside the
//! spawned fetch task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::query::entry::{
    EntrySnapshot, ErasedData, QueryHandle, QueryOptions, QueryStatus,
};
use crate::query::key::QueryKey;
use crate::transport::TransportError;

/// Cache-wide tuning knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry without subscribers stays resident before
    /// collection.
    pub gc_grace: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gc_grace: Duration::from_secs(300),
        }
    }
}

/// Type-erased fetch closure retained per entry so invalidation can refetch.
type Fetcher =
    Arc<dyn Fn() -> BoxFuture<'static, Result<ErasedData, TransportError>> + Send + Sync>;

struct Entry {
    tx: watch::Sender<EntrySnapshot>,
    subscriber_count: usize,
    /// Sequence number of the most recently started fetch; only its response
    /// may update this entry.
    latest_seq: u64,
    /// Bumped on every subscribe/unsubscribe so a pending GC task can tell
    /// the entry was touched since it was scheduled.
    gc_epoch: u64,
    fetcher: Option<Fetcher>,
}

impl Entry {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(EntrySnapshot::idle());
        Self {
            tx,
            subscriber_count: 0,
            latest_seq: 0,
            gc_epoch: 0,
            fetcher: None,
        }
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    /// Dedup map: key → sequence number of the fetch currently in flight.
    in_flight: HashMap<QueryKey, u64>,
}

struct Shared {
    state: Mutex<CacheState>,
    config: CacheConfig,
    next_seq: AtomicU64,
}

/// Handle to the process-wide query cache. Cheap to clone.
#[derive(Clone)]
pub struct QueryCache {
    shared: Arc<Shared>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(CacheState::default()),
                config,
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to `key`, fetching through `fetcher` when needed.
    ///
    /// If the entry is missing, it is created and a fetch starts. If it is
    /// fresh under `options.stale_time` and `refetch_on_mount` is off, cached
    /// data is served with no network call. Otherwise cached data is served
    /// immediately while a background refetch runs; an already in-flight
    /// fetch for the same key is joined instead of duplicated.
    pub fn subscribe<T, F, Fut>(
        &self,
        key: QueryKey,
        fetcher: F,
        options: QueryOptions,
    ) -> QueryHandle<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let erased: Fetcher = Arc::new(move || {
            let fut = fetcher();
            async move { fut.await.map(|value| Arc::new(value) as ErasedData) }.boxed()
        });

        let mut st = self.lock();

        let entry = st.entries.entry(key.clone()).or_insert_with(Entry::new);
        entry.subscriber_count += 1;
        entry.gc_epoch += 1;
        if options.enabled {
            // A disabled subscription must never fetch, not even through a
            // later invalidation, so it leaves no fetcher on the entry.
            entry.fetcher = Some(erased);
        }
        let rx = entry.tx.subscribe();
        let snapshot = entry.tx.borrow().clone();

        if options.enabled {
            let needs_fetch = match snapshot.status {
                QueryStatus::Idle | QueryStatus::Error => true,
                QueryStatus::Loading => false,
                QueryStatus::Success => {
                    options.refetch_on_mount || !snapshot.is_fresh(options.stale_time)
                }
            };

            if needs_fetch && !st.in_flight.contains_key(&key) {
                self.start_fetch(&mut st, &key);
            } else if !needs_fetch {
                trace!(%key, "serving fresh cached data");
            }
        }

        drop(st);
        QueryHandle::new(key, self.clone(), rx)
    }

    /// Mark every entry under `prefix` stale; entries with subscribers are
    /// refetched in the background, superseding any fetch already in flight.
    /// Cached data is never dropped here.
    pub fn invalidate(&self, prefix: &QueryKey) {
        let mut st = self.lock();

        let matching: Vec<QueryKey> = st
            .entries
            .keys()
            .filter(|key| prefix.is_prefix_of(key))
            .cloned()
            .collect();

        debug!(%prefix, count = matching.len(), "invalidating cache entries");

        for key in matching {
            let has_subscribers = {
                let entry = st
                    .entries
                    .get_mut(&key)
                    .expect("matching key vanished under lock");
                entry.tx.send_modify(|s| s.is_stale = true);
                entry.subscriber_count > 0
            };
            if has_subscribers {
                self.start_fetch(&mut st, &key);
            }
        }
    }

    /// Current state of the entry for `key`, if one exists. Monitoring and
    /// test support; does not count as a subscription.
    pub fn peek(&self, key: &QueryKey) -> Option<EntrySnapshot> {
        self.lock().entries.get(key).map(|e| e.tx.borrow().clone())
    }

    /// Number of resident cache entries.
    pub fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Number of fetches currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.shared
            .state
            .lock()
            .expect("query cache lock poisoned")
    }

    /// Dispatch a fetch for `key`, superseding any fetch already in flight.
    ///
    /// Assigns the next sequence number, records it as the entry's latest,
    /// and spawns the transport call. The status flips to `Loading` only when
    /// there is no prior successful payload to keep showing.
    fn start_fetch(&self, st: &mut CacheState, key: &QueryKey) {
        let Some(entry) = st.entries.get_mut(key) else {
            return;
        };
        let Some(fetcher) = entry.fetcher.clone() else {
            return;
        };

        let seq = self.shared.next_seq.fetch_add(1, Ordering::Relaxed) + 1;
        entry.latest_seq = seq;
        entry.tx.send_modify(|s| {
            if s.data.is_none() {
                s.status = QueryStatus::Loading;
                s.error = None;
            }
        });
        st.in_flight.insert(key.clone(), seq);

        trace!(%key, seq, "dispatching fetch");

        let shared = self.shared.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let result = fetcher().await;

            let mut st = shared.state.lock().expect("query cache lock poisoned");
            if st.in_flight.get(&key) == Some(&seq) {
                st.in_flight.remove(&key);
            }

            let Some(entry) = st.entries.get_mut(&key) else {
                // Entry was collected while the fetch ran; nobody wants this.
                debug!(%key, seq, "discarding response for evicted entry");
                return;
            };
            if entry.latest_seq != seq {
                // A newer fetch was started for this key; this response is
                // stale by the ordering rule and must not be applied.
                debug!(%key, seq, latest = entry.latest_seq, "discarding superseded response");
                return;
            }

            match result {
                Ok(data) => {
                    entry.tx.send_modify(|s| {
                        s.status = QueryStatus::Success;
                        s.data = Some(data);
                        s.error = None;
                        s.is_stale = false;
                        s.last_fetched_at = Some(Instant::now());
                    });
                    trace!(%key, seq, "fetch committed");
                }
                Err(err) => {
                    // Prior data stays visible alongside the error.
                    entry.tx.send_modify(|s| {
                        s.status = QueryStatus::Error;
                        s.error = Some(Arc::new(err));
                    });
                    debug!(%key, seq, "fetch failed");
                }
            }
        });
    }

    /// Release one subscription slot; called from [`QueryHandle`]'s `Drop`.
    ///
    /// When the count reaches zero, collection is scheduled after the grace
    /// period. A resubscription during the window bumps the entry's epoch
    /// and the scheduled task becomes a no-op.
    pub(crate) fn unsubscribe(&self, key: &QueryKey) {
        let mut st = self.lock();
        let Some(entry) = st.entries.get_mut(key) else {
            return;
        };
        entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
        if entry.subscriber_count > 0 {
            return;
        }

        entry.gc_epoch += 1;
        let epoch = entry.gc_epoch;
        let grace = self.shared.config.gc_grace;
        let shared = self.shared.clone();
        let key = key.clone();

        // Handles may be dropped outside a runtime (e.g. at process exit);
        // skipping GC there is fine, the maps die with the process.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        handle.spawn(async move {
            tokio::time::sleep(grace).await;

            let mut st = shared.state.lock().expect("query cache lock poisoned");
            let collectable = st
                .entries
                .get(&key)
                .is_some_and(|e| e.subscriber_count == 0 && e.gc_epoch == epoch);
            if collectable {
                st.entries.remove(&key);
                st.in_flight.remove(&key);
                debug!(%key, "collected entry after grace period");
            }
        });
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
