//! Frame decoder seam
//!
//! The scheduler never touches pixels itself. Everything that reads media
//! goes through [`FrameDecoder`]; blocking calls are issued from the worker
//! pool, and multi-frame sessions report back through a [`FrameSink`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::PreviewError;
use super::types::{AssetHandle, Frame, TargetSize};

/// Identifies one multi-frame decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Decodable video opened by a decoder.
///
/// The decoder keeps whatever native state it needs behind `native`; the
/// scheduler only reads the id and duration.
#[derive(Clone)]
pub struct VideoSource {
    asset_id: String,
    duration: Duration,
    native: Arc<dyn Any + Send + Sync>,
}

impl VideoSource {
    pub fn new(
        asset_id: impl Into<String>,
        duration: Duration,
        native: impl Any + Send + Sync,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            duration,
            native: Arc::new(native),
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Duration reported by the opened media, which may differ from the catalog's.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Downcast the decoder-specific state.
    pub fn native<T: Any>(&self) -> Option<&T> {
        self.native.downcast_ref::<T>()
    }
}

impl fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoSource")
            .field("asset_id", &self.asset_id)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

/// Progress of a multi-frame decode session.
#[derive(Debug, Clone)]
pub enum DecodeEvent {
    /// A frame for one of the requested timestamps.
    Frame { timestamp: f64, frame: Frame },
    /// The batch cannot complete.
    Failed(PreviewError),
    /// The decoder abandoned the session after `cancel_session`.
    Cancelled,
}

/// Channel through which a session reports its frames.
///
/// Events may arrive in any order and from any thread. Reporting after the
/// scheduler lost interest is harmless; stale events are discarded.
#[derive(Clone)]
pub struct FrameSink {
    session: SessionId,
    deliver: Arc<dyn Fn(SessionId, DecodeEvent) + Send + Sync>,
}

impl FrameSink {
    pub fn new(
        session: SessionId,
        deliver: impl Fn(SessionId, DecodeEvent) + Send + Sync + 'static,
    ) -> Self {
        Self {
            session,
            deliver: Arc::new(deliver),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn frame(&self, timestamp: f64, frame: Frame) {
        (self.deliver)(self.session, DecodeEvent::Frame { timestamp, frame });
    }

    pub fn fail(&self, error: PreviewError) {
        (self.deliver)(self.session, DecodeEvent::Failed(error));
    }

    pub fn cancelled(&self) {
        (self.deliver)(self.session, DecodeEvent::Cancelled);
    }
}

/// Media decoding capability consumed by the scheduler.
///
/// `decode_still`, `open_video` and `frame_at` may block; they are called from
/// worker threads. `generate_frames` must return promptly and report through
/// the sink, and `cancel_session` is best-effort.
///
/// Every session must end by reporting its last frame, a failure or
/// [`FrameSink::cancelled`], even after `cancel_session`: the scheduler keeps
/// the next video waiting until then.
pub trait FrameDecoder: Send + Sync {
    /// Decode a still image asset at `size`.
    fn decode_still(
        &self,
        asset: &AssetHandle,
        size: TargetSize,
        allow_network: bool,
    ) -> Result<Frame, PreviewError>;

    /// Obtain a decodable source for a video asset.
    fn open_video(
        &self,
        asset: &AssetHandle,
        allow_network: bool,
    ) -> Result<VideoSource, PreviewError>;

    /// Decode the single frame nearest to `timestamp` seconds.
    fn frame_at(
        &self,
        source: &VideoSource,
        size: TargetSize,
        timestamp: f64,
    ) -> Result<Frame, PreviewError>;

    /// Start decoding every timestamp asynchronously, reporting through `sink`.
    fn generate_frames(
        &self,
        source: &VideoSource,
        size: TargetSize,
        timestamps: &[f64],
        sink: FrameSink,
    );

    /// Abandon whatever remains of a session.
    fn cancel_session(&self, session: SessionId);
}
