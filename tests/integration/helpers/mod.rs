//! Shared helpers for scheduler integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use asset_preview::preview::{FrameSink, SessionId, VideoSource};
use asset_preview::{
    AssetHandle, Config, Frame, FrameDecoder, PreviewError, PreviewResult, PreviewScheduler,
    SyntheticDecoder, TargetSize,
};

/// Upper bound for anything the synthetic decoder does in these tests
pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Receives every result delivered to the handlers it hands out.
pub struct Collector {
    tx: Sender<PreviewResult>,
    rx: Receiver<PreviewResult>,
}

impl Collector {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    pub fn handler(&self) -> impl Fn(PreviewResult) + Send + Sync + 'static {
        let tx = self.tx.clone();
        move |result| {
            let _ = tx.send(result);
        }
    }

    /// Collect results up to and including the first terminal one.
    pub fn until_terminal(&self) -> Vec<PreviewResult> {
        let mut results = Vec::new();
        loop {
            let result = self
                .rx
                .recv_timeout(TIMEOUT)
                .unwrap_or_else(|_| panic!("no terminal result after {:?}", results));
            let done = result.preview.is_terminal();
            results.push(result);
            if done {
                return results;
            }
        }
    }

    /// Collect whatever arrives within `window`.
    pub fn drain_for(&self, window: Duration) -> Vec<PreviewResult> {
        let deadline = Instant::now() + window;
        let mut results = Vec::new();
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match self.rx.recv_timeout(left) {
                Ok(result) => results.push(result),
                Err(_) => break,
            }
        }
        results
    }
}

/// Poll `condition` until it holds or [`TIMEOUT`] passes.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Synthetic decoder with a short per-frame delay
pub fn fast_decoder() -> SyntheticDecoder {
    SyntheticDecoder::new().with_frame_delay(Duration::from_millis(1))
}

/// Synthetic decoder slow enough to observe queue states
pub fn slow_decoder() -> SyntheticDecoder {
    SyntheticDecoder::new().with_frame_delay(Duration::from_millis(40))
}

pub fn start(decoder: &Arc<SyntheticDecoder>, config: &Config) -> PreviewScheduler {
    PreviewScheduler::new(Arc::clone(decoder) as Arc<dyn FrameDecoder>, config)
}

pub fn failures_reported() -> Config {
    let mut config = Config::default();
    config.scheduler.report_failures = true;
    config
}

/// Synthetic decoder whose video sources, after the first, open only once
/// [`GatedDecoder::release`] is called.
pub struct GatedDecoder {
    pub inner: SyntheticDecoder,
    opens: AtomicUsize,
    released: Mutex<bool>,
    gate: Condvar,
}

impl GatedDecoder {
    pub fn new(inner: SyntheticDecoder) -> Self {
        Self {
            inner,
            opens: AtomicUsize::new(0),
            released: Mutex::new(false),
            gate: Condvar::new(),
        }
    }

    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.gate.notify_all();
    }
}

impl FrameDecoder for GatedDecoder {
    fn decode_still(
        &self,
        asset: &AssetHandle,
        size: TargetSize,
        allow_network: bool,
    ) -> Result<Frame, PreviewError> {
        self.inner.decode_still(asset, size, allow_network)
    }

    fn open_video(
        &self,
        asset: &AssetHandle,
        allow_network: bool,
    ) -> Result<VideoSource, PreviewError> {
        if self.opens.fetch_add(1, Ordering::SeqCst) > 0 {
            let mut released = self.released.lock().unwrap();
            while !*released {
                released = self.gate.wait(released).unwrap();
            }
        }
        self.inner.open_video(asset, allow_network)
    }

    fn frame_at(
        &self,
        source: &VideoSource,
        size: TargetSize,
        timestamp: f64,
    ) -> Result<Frame, PreviewError> {
        self.inner.frame_at(source, size, timestamp)
    }

    fn generate_frames(
        &self,
        source: &VideoSource,
        size: TargetSize,
        timestamps: &[f64],
        sink: FrameSink,
    ) {
        self.inner.generate_frames(source, size, timestamps, sink)
    }

    fn cancel_session(&self, session: SessionId) {
        self.inner.cancel_session(session)
    }
}
