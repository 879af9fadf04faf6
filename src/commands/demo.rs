//! Demo command handler
//!
//! Drives a synthetic catalog through the scheduler twice: once through the
//! warmer, then as direct requests that should all be answered from cache.

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use asset_preview::preview::{MediaKind, SchedulerStats};
use asset_preview::{
    AssetHandle, FrameDecoder, Preview, PreviewResult, PreviewScheduler, PreviewWarmer,
    SyntheticDecoder, TargetSize,
};

use super::load_config;

const WARM_TIMEOUT: Duration = Duration::from_secs(60);
const RESULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DemoArgs {
    pub videos: usize,
    pub images: usize,
    pub duration: f64,
    pub frame_delay_ms: u64,
    pub width: u32,
    pub height: u32,
}

#[cfg(not(tarpaulin_include))]
pub fn handle(config_path: Option<&Path>, args: &DemoArgs) -> Result<()> {
    if !args.duration.is_finite() || args.duration < 0.0 {
        bail!("Clip duration must be a non-negative number of seconds");
    }
    if args.width == 0 || args.height == 0 {
        bail!("Preview size must be at least 1x1");
    }

    let config = load_config(config_path)?;
    let options = config.defaults.request_options();
    let size = TargetSize::new(args.width, args.height);

    let decoder = Arc::new(
        SyntheticDecoder::new().with_frame_delay(Duration::from_millis(args.frame_delay_ms)),
    );
    let scheduler = PreviewScheduler::new(Arc::clone(&decoder) as Arc<dyn FrameDecoder>, &config);
    let assets = SyntheticDecoder::catalog(
        args.videos,
        args.images,
        Duration::from_secs_f64(args.duration),
    );

    let warmer = PreviewWarmer::new(scheduler.clone());
    let started = Instant::now();
    warmer.start_warm(&assets, size, &options);
    while warmer.outstanding() > 0 {
        if started.elapsed() > WARM_TIMEOUT {
            warmer.stop_all();
            bail!("Timed out warming {} previews", assets.len());
        }
        thread::sleep(Duration::from_millis(10));
    }
    println!(
        "Warmed {} assets in {:.0?} ({} stills, {} sessions)",
        assets.len(),
        started.elapsed(),
        decoder.still_calls(),
        decoder.sessions_started()
    );

    let (tx, rx) = channel::<(String, PreviewResult)>();
    for asset in &assets {
        let tx = tx.clone();
        let asset_id = asset.id().to_string();
        scheduler.request_preview(asset, size, &options, move |result| {
            let _ = tx.send((asset_id.clone(), result));
        });
    }
    drop(tx);

    let mut remaining = assets.len();
    while remaining > 0 {
        match rx.recv_timeout(RESULT_TIMEOUT) {
            Ok((asset_id, result)) => {
                if !result.preview.is_terminal() {
                    continue;
                }
                remaining -= 1;
                print_result(&assets, &asset_id, &result, options.frame_interval());
            }
            Err(RecvTimeoutError::Timeout) => bail!("Timed out waiting for {remaining} previews"),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    print_stats(&scheduler.stats(), decoder.as_ref());
    scheduler.shutdown();
    Ok(())
}

fn print_result(assets: &[AssetHandle], asset_id: &str, result: &PreviewResult, interval: Duration) {
    let kind = assets
        .iter()
        .find(|asset| asset.id() == asset_id)
        .map(AssetHandle::kind);
    let label = match kind {
        Some(MediaKind::Video) => "video",
        Some(MediaKind::Image) => "image",
        None => "?",
    };
    let detail = match &result.preview {
        Preview::Image { image, .. } => format!("still {}x{}", image.width(), image.height()),
        Preview::AnimationFrames { frames } => format!(
            "{} frames, loops every {:.2?}",
            frames.len(),
            result.preview.playback_duration(interval).unwrap_or_default()
        ),
        Preview::Failed { error } => format!("failed: {error}"),
        other => format!("{other:?}"),
    };
    println!("  {asset_id:<10} {label:<6} {detail}");
}

fn print_stats(stats: &SchedulerStats, decoder: &SyntheticDecoder) {
    println!(
        "Cache: {} entries; decoder: {} stills, {} opens, {} single frames, {} sessions",
        stats.cached,
        decoder.still_calls(),
        decoder.open_calls(),
        decoder.single_frame_calls(),
        decoder.sessions_started()
    );
}
