//! Unit tests for the result cache and its keys

use std::time::Duration;

use asset_preview::preview::CacheKey;
use asset_preview::{AssetHandle, RequestOptions, ResultCache, TargetSize};

use crate::helpers::still;

fn key_for(id: &str) -> CacheKey {
    CacheKey::new(
        &AssetHandle::image(id),
        TargetSize::new(64, 64),
        &RequestOptions::default(),
    )
}

#[test]
fn repeated_put_keeps_first_result() {
    let cache = ResultCache::new(4);
    assert!(cache.put(key_for("a"), still("first", 10)));
    assert!(!cache.put(key_for("a"), still("second", 20)));

    let cached = cache.get(&key_for("a")).unwrap();
    assert_eq!(cached.request_id.as_str(), "first");
    assert_eq!(cache.len(), 1);
}

#[test]
fn repeated_put_refreshes_recency() {
    let cache = ResultCache::new(2);
    cache.put(key_for("a"), still("a", 1));
    cache.put(key_for("b"), still("b", 2));
    cache.put(key_for("a"), still("a-again", 3));
    cache.put(key_for("c"), still("c", 4));

    assert!(cache.contains(&key_for("a")));
    assert!(!cache.contains(&key_for("b")));
    assert!(cache.contains(&key_for("c")));
}

#[test]
fn clones_share_entries() {
    let cache = ResultCache::new(8);
    let other = cache.clone();
    cache.put(key_for("a"), still("a", 1));
    assert!(other.contains(&key_for("a")));
    other.clear();
    assert!(cache.is_empty());
}

#[test]
fn keys_differ_by_size_and_options() {
    let clip = AssetHandle::video("clip", Duration::from_secs(4));
    let options = RequestOptions::default();
    let small = CacheKey::new(&clip, TargetSize::new(80, 45), &options);
    let large = CacheKey::new(&clip, TargetSize::new(160, 90), &options);
    let sparse = CacheKey::new(
        &clip,
        TargetSize::new(80, 45),
        &options.clone().with_coverage_fraction(0.5),
    );
    assert_ne!(small, large);
    assert_ne!(small, sparse);
}

#[test]
fn keys_ignore_flags_outside_the_signature() {
    let clip = AssetHandle::video("clip", Duration::from_secs(4));
    let size = TargetSize::new(80, 45);
    let plain = RequestOptions::default();
    let eager = RequestOptions::default()
        .with_degraded_first(false)
        .with_progressive_frames(false)
        .with_network_fetch(true);
    assert_eq!(
        CacheKey::new(&clip, size, &plain),
        CacheKey::new(&clip, size, &eager)
    );
}

#[test]
fn degraded_key_is_distinct_from_final_key() {
    let key = key_for("photo");
    let degraded = key.degraded();
    assert_ne!(key, degraded);
    assert!(degraded.as_str().ends_with(".degraded"));
    assert_eq!(degraded.degraded(), degraded);
}
