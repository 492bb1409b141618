//! Cache behavior through the resolver: deduplication, hits, eviction,
//! flushing and retry.

use std::sync::Arc;

use image_pipeline::cache::ImageCache;
use image_pipeline::error::ImageError;
use image_pipeline::provider::{ImageConfiguration, ImageResolver};

use super::test_utils::{Event, MockProvider, Recorder};

fn resolver(maximum_size: usize, maximum_size_bytes: usize) -> ImageResolver {
    ImageResolver::new(Arc::new(ImageCache::with_limits(
        maximum_size,
        maximum_size_bytes,
    )))
}

fn cached_names(resolver: &ImageResolver) -> Vec<String> {
    resolver
        .cache()
        .keys()
        .iter()
        .map(|key| key.downcast_ref::<String>().cloned().unwrap())
        .collect()
}

// =============================================================================
// Deduplication and Hits
// =============================================================================

#[test]
fn test_concurrent_requests_share_one_load() {
    let resolver = resolver(10, 1_000_000);
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let first = Recorder::new();
    let second = Recorder::new();
    first.listen(&resolver.resolve(&provider, &config));
    second.listen(&resolver.resolve(&provider, &config));

    assert_eq!(provider.load_count(), 1);
    assert_eq!(resolver.cache().pending_count(), 1);
    assert_eq!(resolver.cache().current_size(), 0);

    provider.complete(100);

    let expected = vec![Event::Image {
        synchronous: false,
        size_bytes: 100,
    }];
    assert_eq!(first.events(), expected);
    assert_eq!(second.events(), expected);
    assert_eq!(resolver.cache().pending_count(), 0);
}

#[test]
fn test_cold_miss_then_warm_hit() {
    let resolver = resolver(2, 1_000_000);
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    resolver.resolve(&provider, &config);
    provider.complete(100);

    assert_eq!(resolver.cache().current_size(), 1);
    assert_eq!(resolver.cache().current_size_bytes(), 100);

    let warm = Recorder::new();
    warm.listen(&resolver.resolve(&provider, &config));

    assert_eq!(provider.load_count(), 1);
    assert_eq!(
        warm.events(),
        vec![Event::Image {
            synchronous: true,
            size_bytes: 100,
        }]
    );

    let stats = resolver.cache().stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

// =============================================================================
// Eviction
// =============================================================================

#[test]
fn test_count_limit_evicts_least_recently_used() {
    let resolver = resolver(2, 1_000_000);
    let config = ImageConfiguration::empty();
    let (a, b, c) = (
        MockProvider::new("a"),
        MockProvider::new("b"),
        MockProvider::new("c"),
    );

    for provider in [&a, &b, &c] {
        resolver.resolve(provider, &config);
        provider.complete(100);
    }

    assert_eq!(cached_names(&resolver), vec!["b", "c"]);
    assert_eq!(resolver.cache().current_size_bytes(), 200);

    resolver.resolve(&a, &config);
    assert_eq!(a.load_count(), 2);
}

#[test]
fn test_single_entry_cache_keeps_latest() {
    let resolver = resolver(1, 1_000_000);
    let config = ImageConfiguration::empty();
    let (a, b) = (MockProvider::new("a"), MockProvider::new("b"));

    resolver.resolve(&a, &config);
    a.complete(48);
    resolver.resolve(&b, &config);
    b.complete(48);

    assert_eq!(cached_names(&resolver), vec!["b"]);
    assert_eq!(resolver.cache().current_size_bytes(), 48);
}

#[test]
fn test_hit_refreshes_recency() {
    let resolver = resolver(2, 1_000_000);
    let config = ImageConfiguration::empty();
    let (a, b, c) = (
        MockProvider::new("a"),
        MockProvider::new("b"),
        MockProvider::new("c"),
    );

    resolver.resolve(&a, &config);
    a.complete(100);
    resolver.resolve(&b, &config);
    b.complete(100);

    resolver.resolve(&a, &config);

    resolver.resolve(&c, &config);
    c.complete(100);

    assert_eq!(cached_names(&resolver), vec!["a", "c"]);
}

#[test]
fn test_byte_limit_evicts() {
    let resolver = resolver(10, 250);
    let config = ImageConfiguration::empty();
    let (a, b, c) = (
        MockProvider::new("a"),
        MockProvider::new("b"),
        MockProvider::new("c"),
    );

    for provider in [&a, &b, &c] {
        resolver.resolve(provider, &config);
        provider.complete(100);
    }

    assert_eq!(cached_names(&resolver), vec!["b", "c"]);
    assert_eq!(resolver.cache().current_size_bytes(), 200);
}

#[test]
fn test_oversized_image_widens_byte_limit() {
    let resolver = resolver(10, 100);
    let config = ImageConfiguration::empty();
    let (small, big) = (MockProvider::new("small"), MockProvider::new("big"));

    resolver.resolve(&small, &config);
    small.complete(40);
    resolver.resolve(&big, &config);
    big.complete(400);

    assert_eq!(resolver.cache().maximum_size_bytes(), 1400);
    assert_eq!(cached_names(&resolver), vec!["small", "big"]);
    assert_eq!(resolver.cache().current_size_bytes(), 440);
}

#[test]
fn test_tightening_limits_evicts_immediately() {
    let resolver = resolver(10, 1_000_000);
    let config = ImageConfiguration::empty();
    let providers = ["a", "b", "c", "d"].map(MockProvider::new);

    for provider in &providers {
        resolver.resolve(provider, &config);
        provider.complete(100);
    }

    resolver.cache().set_maximum_size(3);
    assert_eq!(cached_names(&resolver), vec!["b", "c", "d"]);

    resolver.cache().set_maximum_size_bytes(200);
    assert_eq!(cached_names(&resolver), vec!["c", "d"]);
}

// =============================================================================
// Flushing
// =============================================================================

#[test]
fn test_zero_limit_flushes_and_disables_caching() {
    let resolver = resolver(2, 1_000_000);
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    resolver.resolve(&provider, &config);
    provider.complete(100);
    resolver.cache().set_maximum_size(0);

    assert_eq!(resolver.cache().current_size(), 0);
    assert_eq!(resolver.cache().current_size_bytes(), 0);

    let recorder = Recorder::new();
    recorder.listen(&resolver.resolve(&provider, &config));
    provider.complete(100);

    assert_eq!(provider.load_count(), 2);
    assert_eq!(resolver.cache().current_size(), 0);
    assert_eq!(recorder.events().len(), 1);

    resolver.resolve(&provider, &config);
    assert_eq!(provider.load_count(), 3);
}

#[test]
fn test_zero_byte_limit_flushes_immediately() {
    let resolver = resolver(10, 1_000_000);
    let config = ImageConfiguration::empty();
    let providers = ["a", "b", "c"].map(MockProvider::new);
    let in_flight = MockProvider::new("in-flight");

    for provider in &providers {
        resolver.resolve(provider, &config);
        provider.complete(100);
    }
    resolver.resolve(&in_flight, &config);
    assert_eq!(resolver.cache().current_size(), 3);

    resolver.cache().set_maximum_size_bytes(0);

    assert_eq!(resolver.cache().current_size(), 0);
    assert_eq!(resolver.cache().current_size_bytes(), 0);
    assert_eq!(resolver.cache().pending_count(), 1);
}

#[test]
fn test_clear_keeps_pending_loads() {
    let resolver = resolver(10, 1_000_000);
    let config = ImageConfiguration::empty();
    let (done, running) = (MockProvider::new("done"), MockProvider::new("running"));

    resolver.resolve(&done, &config);
    done.complete(100);
    resolver.resolve(&running, &config);

    resolver.cache().clear();
    assert_eq!(resolver.cache().current_size(), 0);
    assert_eq!(resolver.cache().pending_count(), 1);

    // Joins the surviving in-flight load
    resolver.resolve(&running, &config);
    assert_eq!(running.load_count(), 1);

    running.complete(100);
    assert_eq!(cached_names(&resolver), vec!["running"]);
}

#[test]
fn test_evict_through_resolver() {
    let resolver = resolver(10, 1_000_000);
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    resolver.resolve(&provider, &config);
    assert!(!resolver.evict(&provider, &config).unwrap());

    provider.complete(100);
    assert!(resolver.evict(&provider, &config).unwrap());
    assert_eq!(resolver.cache().current_size_bytes(), 0);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failed_load_is_retried() {
    let resolver = resolver(10, 1_000_000);
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let recorder = Recorder::new();
    recorder.listen(&resolver.resolve(&provider, &config));
    provider.fail(ImageError::Decode("truncated".to_string()));

    assert_eq!(
        recorder.events(),
        vec![Event::Error("Failed to decode image: truncated".to_string())]
    );
    assert_eq!(resolver.cache().pending_count(), 0);
    assert_eq!(resolver.cache().current_size(), 0);

    resolver.resolve(&provider, &config);
    assert_eq!(provider.load_count(), 2);

    provider.complete(100);
    assert_eq!(resolver.cache().current_size(), 1);
}
