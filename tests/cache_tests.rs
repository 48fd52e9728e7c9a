//! Cache-level properties: dedup, ordering, staleness, invalidation, GC.
//!
//! These tests drive the cache with in-process fetchers; no HTTP involved.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use review_console::api::feedbacks::feedback_keys;
use review_console::api::repos::repo_keys;
use review_console::api::reviews::review_keys;
use review_console::query::{
    CacheConfig, ParamValue, QueryCache, QueryError, QueryKey, QueryOptions, QueryStatus,
};
use review_console::transport::TransportError;

fn test_cache() -> QueryCache {
    QueryCache::new(CacheConfig {
        gc_grace: Duration::from_millis(50),
    })
}

fn list_key(page: i64) -> QueryKey {
    let mut params = review_console::query::ParamRecord::new();
    params.insert("page".to_string(), ParamValue::Int(page));
    QueryKey::list("repos", params)
}

#[tokio::test]
async fn test_two_subscribers_one_fetch() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, TransportError>(42u32)
            }
        }
    };

    let mut a = cache.subscribe(list_key(1), fetcher.clone(), QueryOptions::default());
    let mut b = cache.subscribe(list_key(1), fetcher, QueryOptions::default());

    assert_eq!(*a.resolve().await.unwrap(), 42);
    assert_eq!(*b.resolve().await.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_entries_with_different_params_are_independent() {
    let cache = test_cache();

    let mut page1 = cache.subscribe(
        list_key(1),
        || async { Ok::<_, TransportError>("page-1") },
        QueryOptions::default(),
    );
    let mut page2 = cache.subscribe(
        list_key(2),
        || async { Ok::<_, TransportError>("page-2") },
        QueryOptions::default(),
    );

    assert_eq!(*page1.resolve().await.unwrap(), "page-1");
    assert_eq!(*page2.resolve().await.unwrap(), "page-2");

    cache.invalidate(&list_key(1));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let untouched = cache.peek(&list_key(2)).unwrap();
    assert!(!untouched.is_stale);
}

#[tokio::test]
async fn test_most_recently_started_fetch_wins() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    // First dispatch is slow and stale; the superseding one is fast.
    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call == 1 {
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    Ok::<_, TransportError>("stale")
                } else {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok("fresh")
                }
            }
        }
    };

    let handle = cache.subscribe::<&str, _, _>(list_key(1), fetcher, QueryOptions::default());
    cache.invalidate(&QueryKey::prefix(&["repos", "list"]));

    // Wait long enough for both responses to arrive, out of order.
    tokio::time::sleep(Duration::from_millis(250)).await;

    let result = handle.snapshot();
    assert_eq!(result.status, QueryStatus::Success);
    assert_eq!(*result.data.unwrap(), "fresh");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.in_flight_count(), 0);
}

#[tokio::test]
async fn test_prefix_invalidation_granularity() {
    let cache = test_cache();
    let opts = QueryOptions::default().stale_time(Duration::from_secs(60));

    let _l1 = cache.subscribe(
        list_key(1),
        || async { Ok::<_, TransportError>(1u8) },
        opts.clone(),
    );
    let _l2 = cache.subscribe(
        list_key(2),
        || async { Ok::<_, TransportError>(2u8) },
        opts.clone(),
    );
    let _d7 = cache.subscribe(
        QueryKey::detail("repos", 7),
        || async { Ok::<_, TransportError>(7u8) },
        opts,
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.invalidate(&QueryKey::prefix(&["repos", "list"]));

    assert!(cache.peek(&list_key(1)).unwrap().is_stale);
    assert!(cache.peek(&list_key(2)).unwrap().is_stale);
    assert!(!cache.peek(&QueryKey::detail("repos", 7)).unwrap().is_stale);
}

#[tokio::test]
async fn test_invalidation_refetches_subscribed_keys() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move { Ok::<_, TransportError>(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        }
    };

    let mut handle = cache.subscribe(list_key(1), fetcher, QueryOptions::default());
    assert_eq!(*handle.resolve().await.unwrap(), 1);

    cache.invalidate(&QueryKey::prefix(&["repos"]));
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The mounted subscriber got fresh data without an explicit reload.
    let result = handle.snapshot();
    assert_eq!(*result.data.unwrap(), 2);
    assert!(!result.is_stale);
}

#[tokio::test]
async fn test_failed_refetch_preserves_cached_data() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(99u32)
                } else {
                    Err(TransportError::Status { status: 500 })
                }
            }
        }
    };

    let mut handle = cache.subscribe(list_key(1), fetcher, QueryOptions::default());
    assert_eq!(*handle.resolve().await.unwrap(), 99);

    cache.invalidate(&list_key(1));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let result = handle.snapshot();
    assert_eq!(result.status, QueryStatus::Error);
    assert_eq!(result.error.unwrap().status(), Some(500));
    // Stale data stays visible alongside the error.
    assert_eq!(*result.data.unwrap(), 99);
}

#[tokio::test]
async fn test_loading_only_without_prior_data() {
    let cache = test_cache();

    let fetcher = || async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, TransportError>("data")
    };

    let mut handle = cache.subscribe(list_key(1), fetcher, QueryOptions::default());
    assert_eq!(handle.snapshot().status, QueryStatus::Loading);

    handle.resolve().await.unwrap();
    cache.invalidate(&list_key(1));

    // Refetch is running, but the prior payload keeps being served.
    let result = handle.snapshot();
    assert_eq!(result.status, QueryStatus::Success);
    assert!(result.data.is_some());
}

#[tokio::test]
async fn test_disabled_query_never_fetches() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TransportError>(0u8)
            }
        }
    };

    let mut handle = cache.subscribe(
        QueryKey::detail("repos", 0),
        fetcher,
        QueryOptions::default().enabled(false),
    );

    assert_eq!(handle.snapshot().status, QueryStatus::Idle);
    assert!(matches!(
        handle.resolve().await,
        Err(QueryError::CacheMiss)
    ));
    assert_eq!(cache.in_flight_count(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalidation_skips_disabled_entries() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TransportError>(0u8)
            }
        }
    };

    // Placeholder id, subscribed disabled; a namespace-wide invalidation
    // must not turn it into a network call.
    let handle = cache.subscribe(
        repo_keys::detail(0),
        fetcher,
        QueryOptions::default().enabled(false),
    );

    cache.invalidate(&repo_keys::all());
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0, "disabled entry was fetched");
    assert_eq!(cache.in_flight_count(), 0);

    // The entry is still marked stale, so an enabled subscriber arriving
    // later starts from the right state.
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, QueryStatus::Idle);
    assert!(snapshot.is_stale);
}

#[tokio::test]
async fn test_key_builders_scope_invalidation_per_namespace() {
    let cache = test_cache();
    let opts = QueryOptions::default().stale_time(Duration::from_secs(60));
    let fetcher = || async { Ok::<_, TransportError>(0u8) };

    let _repo_list =
        cache.subscribe::<u8, _, _>(repo_keys::list(&Default::default()), fetcher, opts.clone());
    let _repo_detail = cache.subscribe::<u8, _, _>(repo_keys::detail(7), fetcher, opts.clone());
    let _review_list =
        cache.subscribe::<u8, _, _>(review_keys::list(&Default::default()), fetcher, opts.clone());
    let _feedback_list =
        cache.subscribe::<u8, _, _>(feedback_keys::list(&Default::default()), fetcher, opts);

    tokio::time::sleep(Duration::from_millis(20)).await;

    cache.invalidate(&repo_keys::details());
    assert!(cache.peek(&repo_keys::detail(7)).unwrap().is_stale);
    assert!(!cache.peek(&repo_keys::list(&Default::default())).unwrap().is_stale);

    cache.invalidate(&review_keys::all());
    assert!(cache.peek(&review_keys::list(&Default::default())).unwrap().is_stale);
    assert!(!cache.peek(&feedback_keys::list(&Default::default())).unwrap().is_stale);

    cache.invalidate(&feedback_keys::all());
    assert!(cache.peek(&feedback_keys::list(&Default::default())).unwrap().is_stale);
}

#[tokio::test]
async fn test_fresh_entry_served_without_refetch() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let opts = QueryOptions::default().stale_time(Duration::from_secs(60));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TransportError>("cached")
            }
        }
    };

    let mut first = cache.subscribe(list_key(1), fetcher.clone(), opts.clone());
    assert_eq!(*first.resolve().await.unwrap(), "cached");
    drop(first);

    // Remount within the grace period: served from cache, no second call.
    let mut second = cache.subscribe(list_key(1), fetcher, opts);
    assert_eq!(*second.resolve().await.unwrap(), "cached");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refetch_on_mount_forces_fetch() {
    let cache = test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = {
        let calls = calls.clone();
        move || {
            let calls = calls.clone();
            async move { Ok::<_, TransportError>(calls.fetch_add(1, Ordering::SeqCst) + 1) }
        }
    };

    let opts = QueryOptions::default()
        .stale_time(Duration::from_secs(60))
        .refetch_on_mount(true);

    let mut first = cache.subscribe(list_key(1), fetcher.clone(), opts.clone());
    assert_eq!(*first.resolve().await.unwrap(), 1);
    drop(first);

    let handle = cache.subscribe::<usize, _, _>(list_key(1), fetcher, opts);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*handle.snapshot().data.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_entry_collected_after_grace_period() {
    let cache = test_cache();

    let handle = cache.subscribe(
        list_key(1),
        || async { Ok::<_, TransportError>(1u8) },
        QueryOptions::default(),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.entry_count(), 1);

    drop(handle);
    // Still resident during the grace window.
    assert_eq!(cache.entry_count(), 1);

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(cache.entry_count(), 0);
}

#[tokio::test]
async fn test_resubscribe_cancels_collection() {
    let cache = test_cache();

    let fetcher = || async { Ok::<_, TransportError>(1u8) };
    let first = cache.subscribe::<u8, _, _>(list_key(1), fetcher, QueryOptions::default());
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(first);

    let _second = cache.subscribe::<u8, _, _>(list_key(1), fetcher, QueryOptions::default());

    tokio::time::sleep(Duration::from_millis(120)).await;
    // The pending GC from the first unsubscribe must not collect the entry
    // the second subscriber is using.
    assert_eq!(cache.entry_count(), 1);
}
