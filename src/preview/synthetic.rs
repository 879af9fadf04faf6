//! In-process decoder producing solid-colour frames
//!
//! Stands in for a real media backend in the demo and in tests. Every call
//! is counted so callers can check how much decoding a workload caused.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use super::decoder::{FrameDecoder, FrameSink, SessionId, VideoSource};
use super::error::PreviewError;
use super::types::{AssetHandle, Frame, TargetSize};

/// Decoder whose frames are computed rather than read from media.
///
/// Sessions run on their own thread, one frame per `frame_delay`.
pub struct SyntheticDecoder {
    frame_delay: Duration,
    reverse_order: bool,
    unavailable: HashSet<String>,
    failing: HashSet<String>,
    state: Arc<SessionState>,
    counters: Counters,
}

#[derive(Default)]
struct SessionState {
    cancelled: Mutex<HashSet<SessionId>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[derive(Default)]
struct Counters {
    stills: AtomicUsize,
    opens: AtomicUsize,
    single_frames: AtomicUsize,
    sessions: AtomicUsize,
}

impl Default for SyntheticDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticDecoder {
    pub fn new() -> Self {
        Self {
            frame_delay: Duration::from_millis(5),
            reverse_order: false,
            unavailable: HashSet::new(),
            failing: HashSet::new(),
            state: Arc::new(SessionState::default()),
            counters: Counters::default(),
        }
    }

    /// Time spent "decoding" each frame of a session.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = delay;
        self
    }

    /// Complete session frames from the last timestamp to the first.
    pub fn with_reverse_order(mut self, reverse: bool) -> Self {
        self.reverse_order = reverse;
        self
    }

    /// Make `open_video` and `decode_still` fail for an asset.
    pub fn with_unavailable(mut self, asset_id: impl Into<String>) -> Self {
        self.unavailable.insert(asset_id.into());
        self
    }

    /// Make sessions for an asset fail halfway through.
    pub fn with_failing(mut self, asset_id: impl Into<String>) -> Self {
        self.failing.insert(asset_id.into());
        self
    }

    /// A catalog of `videos` clips and `images` stills.
    pub fn catalog(videos: usize, images: usize, duration: Duration) -> Vec<AssetHandle> {
        let clips = (0..videos).map(|i| AssetHandle::video(format!("clip-{i}"), duration));
        let stills = (0..images).map(|i| AssetHandle::image(format!("photo-{i}")));
        clips.chain(stills).collect()
    }

    pub fn still_calls(&self) -> usize {
        self.counters.stills.load(Ordering::SeqCst)
    }

    pub fn open_calls(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }

    pub fn single_frame_calls(&self) -> usize {
        self.counters.single_frames.load(Ordering::SeqCst)
    }

    pub fn sessions_started(&self) -> usize {
        self.counters.sessions.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were decoding at the same time.
    pub fn max_concurrent_sessions(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    pub fn cancelled_sessions(&self) -> Vec<SessionId> {
        let mut sessions: Vec<SessionId> = self.state.cancelled().iter().copied().collect();
        sessions.sort();
        sessions
    }

    fn check_available(&self, asset_id: &str) -> Result<(), PreviewError> {
        if self.unavailable.contains(asset_id) {
            return Err(PreviewError::DecoderUnavailable {
                asset_id: asset_id.to_string(),
                reason: "asset is not available locally".to_string(),
            });
        }
        Ok(())
    }
}

impl SessionState {
    fn cancelled(&self) -> MutexGuard<'_, HashSet<SessionId>> {
        self.cancelled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_cancelled(&self, session: SessionId) -> bool {
        self.cancelled().contains(&session)
    }

    fn begin(&self) {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
    }

    fn end(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Colour derived from the sampled position, so frames are distinguishable.
fn shade_for(timestamp: f64, duration: Duration) -> [u8; 4] {
    let total = duration.as_secs_f64().max(f64::EPSILON);
    let level = ((timestamp / total).clamp(0.0, 1.0) * 255.0) as u8;
    [level, 255 - level, 128, 255]
}

impl FrameDecoder for SyntheticDecoder {
    fn decode_still(
        &self,
        asset: &AssetHandle,
        size: TargetSize,
        _allow_network: bool,
    ) -> Result<Frame, PreviewError> {
        self.counters.stills.fetch_add(1, Ordering::SeqCst);
        self.check_available(asset.id())?;
        thread::sleep(self.frame_delay);
        Ok(Frame::solid(size.width, size.height, [200, 200, 200, 255]))
    }

    fn open_video(
        &self,
        asset: &AssetHandle,
        _allow_network: bool,
    ) -> Result<VideoSource, PreviewError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.check_available(asset.id())?;
        Ok(VideoSource::new(asset.id(), asset.duration(), ()))
    }

    fn frame_at(
        &self,
        source: &VideoSource,
        size: TargetSize,
        timestamp: f64,
    ) -> Result<Frame, PreviewError> {
        self.counters.single_frames.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.frame_delay);
        let rgba = shade_for(timestamp, source.duration());
        Ok(Frame::solid(size.width, size.height, rgba).at(timestamp))
    }

    fn generate_frames(
        &self,
        source: &VideoSource,
        size: TargetSize,
        timestamps: &[f64],
        sink: FrameSink,
    ) {
        self.counters.sessions.fetch_add(1, Ordering::SeqCst);
        let session = sink.session();
        debug!(%session, asset = source.asset_id(), frames = timestamps.len(), "Starting synthetic session");

        let mut order = timestamps.to_vec();
        if self.reverse_order {
            order.reverse();
        }
        let fail_at = self
            .failing
            .contains(source.asset_id())
            .then_some(order.len() / 2);
        let asset_id = source.asset_id().to_string();
        let duration = source.duration();
        let delay = self.frame_delay;
        let state = Arc::clone(&self.state);

        if order.is_empty() {
            return;
        }
        state.begin();
        thread::spawn(move || {
            let last = order.len().saturating_sub(1);
            for (index, timestamp) in order.into_iter().enumerate() {
                thread::sleep(delay);
                if state.is_cancelled(session) {
                    state.end();
                    sink.cancelled();
                    return;
                }
                if fail_at == Some(index) {
                    state.end();
                    sink.fail(PreviewError::FrameDecodeFailed {
                        asset_id,
                        timestamp: Some(timestamp),
                        reason: "synthetic decode failure".to_string(),
                    });
                    return;
                }
                let frame =
                    Frame::solid(size.width, size.height, shade_for(timestamp, duration)).at(timestamp);
                // Leave the active count before the last frame lets the next session start
                if index == last {
                    state.end();
                }
                sink.frame(timestamp, frame);
            }
            trace!(%session, "Synthetic session finished");
        });
    }

    fn cancel_session(&self, session: SessionId) {
        self.state.cancelled().insert(session);
    }
}
