//! Unit tests for the checked-out status cache.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn cache() -> CheckoutStatusCache {
    CheckoutStatusCache::new()
}

/// Looks `path` up with the clock fixed at `now`.
fn at<F>(cache: &CheckoutStatusCache, now: Instant, path: &Path, compute: F) -> StatusLookup
where
    F: FnOnce() -> StatusLookup,
{
    cache.get_or_compute_with(path, || now, compute)
}

fn fstat_reply(calls: &Cell<u32>, checked_out: bool) -> impl FnOnce() -> StatusLookup + '_ {
    move || {
        calls.set(calls.get() + 1);
        StatusLookup::computed(
            checked_out,
            "... action edit\n",
            "",
            "command: p4 fstat -T action f\n",
        )
    }
}

#[rstest]
fn repeat_within_ttl_hits_without_transcript(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let start = Instant::now();
    let path = Path::new("/ws/a.txt");

    let first = at(&cache, start, path, fstat_reply(&calls, true));
    let second = at(
        &cache,
        start + Duration::from_millis(999),
        path,
        fstat_reply(&calls, false),
    );

    assert_eq!(calls.get(), 1);
    assert!(first.transcript().is_some());
    assert_eq!(second.transcript(), None);
    assert!(second.is_checked_out());
    assert_eq!(second.stdout(), first.stdout());
}

#[rstest]
fn expired_entry_triggers_fresh_round_trip(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let start = Instant::now();
    let path = Path::new("/ws/a.txt");

    at(&cache, start, path, fstat_reply(&calls, true));
    let later = at(
        &cache,
        start + Duration::from_millis(1001),
        path,
        fstat_reply(&calls, false),
    );

    assert_eq!(calls.get(), 2);
    assert!(!later.is_checked_out());
    assert!(later.transcript().is_some());
    assert_eq!(cache.len(), 1);
}

#[rstest]
fn lookups_prune_every_expired_entry(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let start = Instant::now();
    for name in ["/ws/a", "/ws/b", "/ws/c"] {
        at(&cache, start, Path::new(name), fstat_reply(&calls, true));
    }
    assert_eq!(cache.len(), 3);

    at(
        &cache,
        start + Duration::from_secs(2),
        Path::new("/ws/d"),
        fstat_reply(&calls, true),
    );
    assert_eq!(cache.len(), 1);
}

#[rstest]
fn paths_are_cached_independently(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let now = Instant::now();
    let a = at(&cache, now, Path::new("/ws/a"), fstat_reply(&calls, true));
    let b = at(&cache, now, Path::new("/ws/b"), fstat_reply(&calls, false));
    assert_eq!(calls.get(), 2);
    assert!(a.is_checked_out());
    assert!(!b.is_checked_out());
}

#[rstest]
fn invalidate_forces_recompute(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let now = Instant::now();
    let path = Path::new("/ws/a");
    at(&cache, now, path, fstat_reply(&calls, false));
    cache.invalidate(path);
    assert!(cache.is_empty());
    at(&cache, now, path, fstat_reply(&calls, true));
    assert_eq!(calls.get(), 2);
}

#[rstest]
fn slow_round_trip_is_stamped_when_it_completes(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let start = Instant::now();
    let finished = start + Duration::from_millis(1100);
    let clock = Cell::new(start);
    let path = Path::new("/ws/slow.txt");

    cache.get_or_compute_with(path, || clock.get(), || {
        clock.set(finished);
        fstat_reply(&calls, true)()
    });
    let repeat = at(
        &cache,
        finished + Duration::from_millis(10),
        path,
        fstat_reply(&calls, false),
    );

    assert_eq!(calls.get(), 1);
    assert!(repeat.is_checked_out());
    assert_eq!(repeat.transcript(), None);
}

#[rstest]
fn invalidation_during_compute_discards_the_answer(cache: CheckoutStatusCache) {
    let calls = Cell::new(0);
    let now = Instant::now();
    let path = Path::new("/ws/racing.txt");

    let stale = at(&cache, now, path, || {
        cache.invalidate(path);
        fstat_reply(&calls, false)()
    });
    assert!(!stale.is_checked_out());
    assert!(cache.is_empty());

    let fresh = at(&cache, now, path, fstat_reply(&calls, true));
    assert_eq!(calls.get(), 2);
    assert!(fresh.is_checked_out());
    assert_eq!(cache.len(), 1);
}

#[test]
fn concurrent_queries_keep_one_entry_per_path() {
    let cache = Arc::new(CheckoutStatusCache::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&cache);
            thread::spawn(move || {
                shared.get_or_compute(Path::new("/ws/shared"), || {
                    StatusLookup::computed(true, "", "", "")
                })
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("query thread").is_checked_out());
    }
    assert_eq!(cache.len(), 1);
}
