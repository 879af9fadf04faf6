//! End-to-end request flows through the scheduler

use std::sync::Arc;
use std::time::Duration;

use asset_preview::preview::CacheKey;
use asset_preview::{
    AssetHandle, Config, FrameDecoder, Preview, PreviewScheduler, RequestOptions, TargetSize,
};

use crate::helpers::{fast_decoder, slow_decoder, start, wait_until, Collector, GatedDecoder};

fn size() -> TargetSize {
    TargetSize::new(32, 18)
}

fn frames_only() -> RequestOptions {
    RequestOptions::default()
        .with_degraded_first(false)
        .with_progressive_frames(false)
}

#[test]
fn image_request_decodes_once_and_then_hits_cache() {
    let decoder = Arc::new(fast_decoder());
    let scheduler = start(&decoder, &Config::default());
    let photo = AssetHandle::image("photo-0");
    let options = RequestOptions::default();

    let collector = Collector::new();
    let id = scheduler
        .request_preview(&photo, size(), &options, collector.handler())
        .expect("first request misses the cache");
    let results = collector.until_terminal();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].request_id, id);
    match &results[0].preview {
        Preview::Image { image, degraded } => {
            assert!(!degraded);
            assert_eq!((image.width(), image.height()), (32, 18));
        }
        other => panic!("expected still, got {other:?}"),
    }
    assert_eq!(decoder.still_calls(), 1);
    assert_eq!(scheduler.cache().len(), 1);

    let again = Collector::new();
    assert!(scheduler
        .request_preview(&photo, size(), &options, again.handler())
        .is_none());
    let cached = again.until_terminal();
    assert_eq!(cached[0].request_id, id);
    assert_eq!(decoder.still_calls(), 1);
}

#[test]
fn video_request_delivers_progress_then_sorted_animation() {
    let decoder = Arc::new(fast_decoder());
    let scheduler = start(&decoder, &Config::default());
    let clip = AssetHandle::video("clip-0", Duration::from_secs(1));
    let options = RequestOptions::default().with_degraded_first(false);

    let collector = Collector::new();
    scheduler.request_preview(&clip, size(), &options, collector.handler());
    let results = collector.until_terminal();

    let progress = results
        .iter()
        .filter(|r| matches!(r.preview, Preview::ProgressImage { .. }))
        .count();
    assert_eq!(progress, 10);
    assert!(results[..results.len() - 1]
        .iter()
        .all(|r| r.preview.is_degraded()));

    let last = results.last().unwrap();
    let frames = last.preview.frames().expect("animation frames");
    let times: Vec<f64> = frames.iter().filter_map(|f| f.timestamp()).collect();
    assert_eq!(times.len(), 10);
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(
        last.preview.playback_duration(options.frame_interval()),
        Some(Duration::from_millis(1500))
    );
}

#[test]
fn frames_completed_out_of_order_are_sorted() {
    let decoder = Arc::new(fast_decoder().with_reverse_order(true));
    let scheduler = start(&decoder, &Config::default());
    let clip = AssetHandle::video("clip-0", Duration::from_millis(500));

    let collector = Collector::new();
    scheduler.request_preview(&clip, size(), &frames_only(), collector.handler());
    let results = collector.until_terminal();

    assert_eq!(results.len(), 1);
    let times: Vec<f64> = results[0]
        .preview
        .frames()
        .unwrap()
        .iter()
        .filter_map(|f| f.timestamp())
        .collect();
    assert_eq!(times.len(), 5);
    assert!(times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn degraded_placeholder_is_cached_under_its_own_key() {
    let decoder = Arc::new(fast_decoder());
    let scheduler = start(&decoder, &Config::default());
    let clip = AssetHandle::video("clip-0", Duration::from_secs(1));
    let options = RequestOptions::default().with_progressive_frames(false);
    let key = CacheKey::new(&clip, size(), &options);

    let collector = Collector::new();
    scheduler.request_preview(&clip, size(), &options, collector.handler());
    let results = collector.until_terminal();

    assert!(results.len() <= 2);
    if results.len() == 2 {
        assert!(matches!(
            results[0].preview,
            Preview::Image { degraded: true, .. }
        ));
    }
    assert!(wait_until(|| scheduler.cache().contains(&key.degraded())));
    assert!(scheduler.cache().contains(&key));
    assert_eq!(decoder.single_frame_calls(), 1);
}

#[test]
fn identical_requests_share_one_session() {
    let decoder = Arc::new(fast_decoder().with_frame_delay(Duration::from_millis(10)));
    let scheduler = start(&decoder, &Config::default());
    let clip = AssetHandle::video("clip-0", Duration::from_secs(1));

    let collector = Collector::new();
    let first = scheduler.request_preview(&clip, size(), &frames_only(), collector.handler());
    let second = scheduler.request_preview(&clip, size(), &frames_only(), collector.handler());
    assert!(first.is_some() && second.is_some());
    assert_ne!(first, second);

    let results = collector.until_terminal();
    let last = results.last().unwrap();
    assert!(matches!(last.preview, Preview::AnimationFrames { .. }));
    assert!(Some(&last.request_id) == first.as_ref() || Some(&last.request_id) == second.as_ref());

    collector.drain_for(Duration::from_millis(100));
    assert_eq!(decoder.sessions_started(), 1);
    assert_eq!(scheduler.stats().sessions_started, 1);
}

#[test]
fn completed_animation_is_served_from_cache() {
    let decoder = Arc::new(fast_decoder());
    let scheduler = start(&decoder, &Config::default());
    let clip = AssetHandle::video("clip-0", Duration::from_millis(300));

    let collector = Collector::new();
    scheduler.request_preview(&clip, size(), &frames_only(), collector.handler());
    let first = collector.until_terminal();

    assert!(scheduler
        .request_preview(&clip, size(), &frames_only(), collector.handler())
        .is_none());
    let second = collector.until_terminal();
    assert_eq!(second, first);
    assert_eq!(decoder.sessions_started(), 1);
}

#[test]
fn only_one_video_decodes_at_a_time() {
    let decoder = Arc::new(fast_decoder().with_frame_delay(Duration::from_millis(3)));
    let scheduler = start(&decoder, &Config::default());

    let collectors: Vec<Collector> = (0..4).map(|_| Collector::new()).collect();
    for (i, collector) in collectors.iter().enumerate() {
        let clip = AssetHandle::video(format!("clip-{i}"), Duration::from_millis(400));
        scheduler.request_preview(&clip, size(), &frames_only(), collector.handler());
    }
    for collector in &collectors {
        let results = collector.until_terminal();
        assert!(matches!(
            results.last().unwrap().preview,
            Preview::AnimationFrames { .. }
        ));
    }

    assert_eq!(decoder.sessions_started(), 4);
    assert_eq!(decoder.max_concurrent_sessions(), 1);
    assert!(wait_until(|| !scheduler.stats().processing));
    assert_eq!(scheduler.stats().waiting, 0);
}

#[test]
fn different_sizes_are_separate_previews() {
    let decoder = Arc::new(fast_decoder());
    let scheduler = start(&decoder, &Config::default());
    let photo = AssetHandle::image("photo-0");

    let collector = Collector::new();
    scheduler.request_preview(&photo, TargetSize::new(10, 10), &frames_only(), collector.handler());
    collector.until_terminal();
    scheduler.request_preview(&photo, TargetSize::new(20, 20), &frames_only(), collector.handler());
    collector.until_terminal();

    assert_eq!(decoder.still_calls(), 2);
    assert_eq!(scheduler.cache().len(), 2);
}

#[test]
fn shutdown_stops_answering_new_requests() {
    let decoder = Arc::new(fast_decoder());
    let scheduler = start(&decoder, &Config::default());
    scheduler.shutdown();

    let collector = Collector::new();
    scheduler.request_preview(
        &AssetHandle::image("photo-0"),
        size(),
        &frames_only(),
        collector.handler(),
    );
    assert!(collector.drain_for(Duration::from_millis(50)).is_empty());
    assert_eq!(decoder.still_calls(), 0);
}

#[test]
fn late_opened_request_gets_cached_result_under_its_own_id() {
    let decoder = Arc::new(GatedDecoder::new(slow_decoder()));
    let scheduler = PreviewScheduler::new(
        Arc::clone(&decoder) as Arc<dyn FrameDecoder>,
        &Config::default(),
    );
    let clip = AssetHandle::video("clip-0", Duration::from_millis(400));

    let first = Collector::new();
    let first_id = scheduler
        .request_preview(&clip, size(), &frames_only(), first.handler())
        .unwrap();
    assert!(wait_until(|| scheduler.stats().processing));
    let second = Collector::new();
    let second_id = scheduler
        .request_preview(&clip, size(), &frames_only(), second.handler())
        .unwrap();

    let produced = first.until_terminal();
    assert_eq!(produced.last().unwrap().request_id, first_id);
    decoder.release();

    let served = second.until_terminal();
    assert_eq!(served.len(), 1);
    assert_eq!(served[0].request_id, second_id);
    assert_eq!(served[0].preview, produced.last().unwrap().preview);
    assert_eq!(decoder.inner.sessions_started(), 1);
}
