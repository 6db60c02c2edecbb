use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::advance;

use super::store::BucketStore;

fn store_with(bucket: &str, ttl_secs: u64) -> BucketStore {
    let store = BucketStore::new();
    store.create_bucket(bucket, Duration::from_secs(ttl_secs));
    store
}

#[tokio::test(start_paused = true)]
async fn set_then_get_returns_value() {
    let store = store_with("tmdb", 3600);
    let value = json!({"page": 1, "results": [{"id": 603}]});

    assert!(store.set("tmdb", "trending:movie:week:1", value.clone(), None));
    let cached = store.get("tmdb", "trending:movie:week:1").unwrap();
    assert_eq!(*cached, value);
}

#[tokio::test(start_paused = true)]
async fn entry_expires_after_ttl() {
    let store = store_with("tmdb", 3600);
    store.set("tmdb", "movie:603", json!({"title": "The Matrix"}), None);

    advance(Duration::from_secs(3599)).await;
    assert!(store.get("tmdb", "movie:603").is_some());

    advance(Duration::from_secs(2)).await;
    assert!(store.get("tmdb", "movie:603").is_none());
}

#[tokio::test(start_paused = true)]
async fn per_call_ttl_overrides_bucket_default() {
    let store = store_with("tmdb", 3600);
    store.set("tmdb", "k", json!(1), Some(Duration::from_secs(60)));

    advance(Duration::from_secs(61)).await;
    assert!(store.get("tmdb", "k").is_none());
}

#[tokio::test(start_paused = true)]
async fn counters_and_hit_rate() {
    let store = store_with("plex", 600);
    store.set("plex", "libraries", json!(["Movies", "Shows"]), None);

    // 3 hits, 1 miss
    for _ in 0..3 {
        assert!(store.get("plex", "libraries").is_some());
    }
    assert!(store.get("plex", "missing").is_none());

    let stats = store.stats(Some("plex"));
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].hits, 3);
    assert_eq!(stats[0].misses, 1);
    assert_eq!(stats[0].hit_rate, 75.0);
    assert_eq!(stats[0].key_count, 1);
    assert!(stats[0].approx_memory_bytes > 0);
}

#[tokio::test(start_paused = true)]
async fn hit_rate_rounds_to_two_decimals() {
    let store = store_with("trakt", 600);
    store.set("trakt", "k", json!(true), None);

    // 1 hit, 2 misses -> 33.333... -> 33.33
    store.get("trakt", "k");
    store.get("trakt", "absent");
    store.get("trakt", "absent");

    let stats = store.stats(Some("trakt"));
    assert_eq!(stats[0].hit_rate, 33.33);
}

#[tokio::test(start_paused = true)]
async fn hit_rate_is_zero_without_reads() {
    let store = store_with("image", 86400);
    let stats = store.stats(Some("image"));
    assert_eq!(stats[0].hit_rate, 0.0);
}

#[tokio::test(start_paused = true)]
async fn delete_semantics() {
    let store = store_with("tmdb", 3600);
    store.set("tmdb", "k", json!(1), None);

    assert!(store.del("tmdb", "k"));
    assert!(store.get("tmdb", "k").is_none());

    assert!(!store.del("tmdb", "k"));
    assert!(!store.del("nonexistent", "k"));

    let stats = store.stats(Some("tmdb"));
    assert_eq!(stats[0].key_count, 0);
}

#[tokio::test(start_paused = true)]
async fn flush_scopes_to_one_bucket() {
    let store = BucketStore::new();
    store.create_bucket("a", Duration::from_secs(600));
    store.create_bucket("b", Duration::from_secs(600));
    store.set("a", "k", json!(1), None);
    store.set("b", "k", json!(2), None);
    store.get("a", "k");
    store.get("b", "k");

    store.flush(Some("a"));

    assert!(store.get("a", "k").is_none());
    assert!(store.get("b", "k").is_some());

    // Counters survive the flush on both buckets
    let stats = store.stats(None);
    let a = stats.iter().find(|s| s.bucket == "a").unwrap();
    let b = stats.iter().find(|s| s.bucket == "b").unwrap();
    assert_eq!(a.hits, 1);
    assert_eq!(a.misses, 1);
    assert_eq!(b.hits, 2);
}

#[tokio::test(start_paused = true)]
async fn flush_all_preserves_counters() {
    let store = BucketStore::new();
    store.create_bucket("a", Duration::from_secs(600));
    store.create_bucket("b", Duration::from_secs(600));
    store.set("a", "k", json!(1), None);
    store.set("b", "k", json!(2), None);
    store.get("a", "k");

    store.flush(None);

    assert!(store.get("a", "k").is_none());
    assert!(store.get("b", "k").is_none());
    let stats = store.stats(None);
    assert!(stats.iter().all(|s| s.key_count == 0));
    assert_eq!(stats.iter().find(|s| s.bucket == "a").unwrap().hits, 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_bucket_degrades_softly() {
    let store = BucketStore::new();

    assert!(store.get("nope", "k").is_none());
    assert!(!store.set("nope", "k", json!(1), None));
    assert!(!store.del("nope", "k"));
    assert!(store.keys("nope").is_empty());
    assert!(store.stats(Some("nope")).is_empty());
}

#[tokio::test(start_paused = true)]
async fn create_bucket_is_idempotent() {
    let store = BucketStore::new();
    store.create_bucket("tmdb", Duration::from_secs(3600));
    store.set("tmdb", "k", json!(1), None);

    // Re-creating must not reset entries or counters
    let again = store.create_bucket("tmdb", Duration::from_secs(5));
    assert_eq!(again.default_ttl(), Duration::from_secs(3600));
    assert!(store.get("tmdb", "k").is_some());
}

#[tokio::test(start_paused = true)]
async fn keys_excludes_expired_entries() {
    let store = store_with("tmdb", 3600);
    store.set("tmdb", "short", json!(1), Some(Duration::from_secs(10)));
    store.set("tmdb", "long", json!(2), None);

    advance(Duration::from_secs(11)).await;

    let keys = store.keys("tmdb");
    assert_eq!(keys, vec!["long".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn background_sweeper_reclaims_on_its_interval() {
    let store = Arc::new(BucketStore::new());
    store.create_bucket("tmdb", Duration::from_secs(3600));
    store.set("tmdb", "a", json!(1), Some(Duration::from_secs(5)));
    store.set("tmdb", "b", json!(2), None);

    let sweeper = Arc::clone(&store).spawn_sweeper(Duration::from_secs(30));
    // Let the spawned task run once so its interval starts at t=0;
    // otherwise the first advance() moves the clock before the task is
    // ever polled and the interval is created late.
    tokio::task::yield_now().await;

    // Entries expire at t=5s; the tick at t=30s should reclaim them. If
    // the task ran, a manual sweep afterwards finds nothing left.
    advance(Duration::from_secs(31)).await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert_eq!(store.sweep(), 0);
    assert!(store.get("tmdb", "b").is_some());

    // The loop keeps going: a later expiry is caught by a later tick
    store.set("tmdb", "c", json!(3), Some(Duration::from_secs(5)));
    advance(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert_eq!(store.sweep(), 0);

    sweeper.abort();
}

#[tokio::test(start_paused = true)]
async fn sweep_reclaims_expired_entries() {
    let store = store_with("tmdb", 3600);
    store.set("tmdb", "a", json!(1), Some(Duration::from_secs(5)));
    store.set("tmdb", "b", json!(2), Some(Duration::from_secs(5)));
    store.set("tmdb", "c", json!(3), None);

    advance(Duration::from_secs(6)).await;
    assert_eq!(store.sweep(), 2);
    assert_eq!(store.sweep(), 0);
    assert!(store.get("tmdb", "c").is_some());
}
