//! Delivery semantics seen by consumers: replay, removal, panic isolation
//! and deferred binding.

use std::sync::Arc;

use image_pipeline::cache::{ImageCache, ImageKey};
use image_pipeline::provider::{ImageConfiguration, ImageResolver};
use image_pipeline::stream::{ImageStream, ImageStreamListener};
use parking_lot::Mutex;

use super::test_utils::{Event, MockProvider, Recorder};

fn default_resolver() -> ImageResolver {
    ImageResolver::new(Arc::new(ImageCache::with_limits(10, 1_000_000)))
}

#[test]
fn test_late_listener_gets_replay() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let stream = resolver.resolve(&provider, &config);
    let early = Recorder::new();
    early.listen(&stream);
    provider.complete(100);

    let late = Recorder::new();
    let handle = stream.add_listener(late.listener());

    assert_eq!(
        late.events(),
        vec![Event::Image {
            synchronous: true,
            size_bytes: 100,
        }]
    );
    assert_eq!(early.events().len(), 1);

    // Already delivered and discarded
    assert!(!stream.remove_listener(handle));
    assert!(!stream.remove_listener(handle));
}

#[test]
fn test_removed_listener_is_not_called() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let stream = resolver.resolve(&provider, &config);
    let kept = Recorder::new();
    let removed = Recorder::new();
    kept.listen(&stream);
    let handle = stream.add_listener(removed.listener());

    assert!(stream.remove_listener(handle));
    provider.complete(100);

    assert_eq!(kept.events().len(), 1);
    assert!(removed.events().is_empty());
}

#[test]
fn test_panicking_listener_does_not_affect_others() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let stream = resolver.resolve(&provider, &config);
    let before = Recorder::new();
    let after = Recorder::new();
    before.listen(&stream);
    stream.add_listener(ImageStreamListener::new(|_, _| panic!("listener bug")));
    after.listen(&stream);

    provider.complete(100);

    assert_eq!(before.events().len(), 1);
    assert_eq!(after.events().len(), 1);
    assert_eq!(resolver.cache().current_size(), 1);
}

#[test]
fn test_listeners_called_once_each() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let recorder = Recorder::new();
    let stream = resolver.resolve(&provider, &config);
    recorder.listen(&stream);

    provider.complete(100);
    provider.complete(100);

    assert_eq!(recorder.events().len(), 1);
}

#[test]
fn test_unbound_stream_forwards_buffered_listeners() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let stream = ImageStream::new();
    let recorder = Recorder::new();
    recorder.listen(&stream);

    let resolved = resolver.resolve(&provider, &config);
    stream
        .set_completer(resolved.completer().unwrap())
        .unwrap();
    provider.complete(100);

    assert_eq!(
        recorder.events(),
        vec![Event::Image {
            synchronous: false,
            size_bytes: 100,
        }]
    );
}

#[test]
fn test_buffered_listener_runs_after_cache_admission() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let stream = ImageStream::new();
    let seen_cached = Arc::new(Mutex::new(None));
    {
        let cache = resolver.cache().clone();
        let seen_cached = seen_cached.clone();
        stream.add_listener(ImageStreamListener::new(move |_, _| {
            *seen_cached.lock() = Some(cache.contains_key(&ImageKey::new("a".to_string())));
        }));
    }

    let resolved = resolver.resolve(&provider, &config);
    stream
        .set_completer(resolved.completer().unwrap())
        .unwrap();
    provider.complete(100);

    assert_eq!(*seen_cached.lock(), Some(true));
}

#[tokio::test]
async fn test_next_image_across_tasks() {
    let resolver = default_resolver();
    let config = ImageConfiguration::empty();
    let provider = MockProvider::new("a");

    let stream = resolver.resolve(&provider, &config);
    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let stream = stream.clone();
            tokio::spawn(async move { stream.next_image().await })
        })
        .collect();

    let completer = provider.last_load();
    while completer.listener_count() < 5 {
        tokio::task::yield_now().await;
    }
    provider.complete(100);

    for waiter in waiters {
        let (info, synchronous) = waiter.await.unwrap().unwrap();
        assert_eq!(info.size_bytes(), 100);
        assert!(!synchronous);
    }
}
