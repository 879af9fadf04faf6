//! Value types shared by the scheduler, the queue and the decoder seam.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::PreviewError;

/// Kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

/// Opaque handle to a media item owned by an external catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetHandle {
    id: String,
    kind: MediaKind,
    duration: Duration,
}

impl AssetHandle {
    /// Handle for a still image.
    pub fn image(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Image,
            duration: Duration::ZERO,
        }
    }

    /// Handle for a video of the given duration.
    pub fn video(id: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            kind: MediaKind::Video,
            duration,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Catalog duration; zero for images.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Pixel size a preview should be produced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a preview should be produced.
///
/// Only `frame_interval` and `coverage_fraction` take part in the cache
/// signature, see [`RequestOptions::signature`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub allow_network_fetch: bool,
    pub want_degraded_first: bool,
    pub want_progressive_frames: bool,
    frame_interval: Duration,
    coverage_fraction: f64,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            allow_network_fetch: false,
            want_degraded_first: true,
            want_progressive_frames: true,
            frame_interval: Duration::from_millis(100),
            coverage_fraction: 1.0,
        }
    }
}

impl RequestOptions {
    pub fn with_network_fetch(mut self, allow: bool) -> Self {
        self.allow_network_fetch = allow;
        self
    }

    pub fn with_degraded_first(mut self, want: bool) -> Self {
        self.want_degraded_first = want;
        self
    }

    pub fn with_progressive_frames(mut self, want: bool) -> Self {
        self.want_progressive_frames = want;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the sampled fraction of the duration, clamped into `(0, 1]`.
    ///
    /// Non-finite or non-positive values fall back to the full duration.
    pub fn with_coverage_fraction(mut self, fraction: f64) -> Self {
        self.coverage_fraction = if fraction.is_finite() && fraction > 0.0 {
            fraction.min(1.0)
        } else {
            1.0
        };
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn coverage_fraction(&self) -> f64 {
        self.coverage_fraction
    }

    /// Cache signature derived from the sampling parameters.
    ///
    /// `allow_network_fetch` and `want_degraded_first` do not participate, so
    /// requests differing only in those share cached results.
    pub fn signature(&self) -> String {
        format!(
            "{}.{}",
            self.frame_interval.as_secs_f64(),
            self.coverage_fraction
        )
    }
}

/// Identifier handed out for every request that misses the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded RGBA8 pixels.
///
/// Pixel storage is shared, so clones are cheap.
#[derive(Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
    timestamp: Option<f64>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
            timestamp: None,
        }
    }

    /// Frame filled with a single RGBA colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let pixels: Vec<u8> = rgba.iter().copied().cycle().take(len * 4).collect();
        Self::new(width, height, pixels)
    }

    /// Attach the presentation time the frame was decoded at.
    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Payload of a delivered preview.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// A single still, either final or a degraded placeholder.
    Image { image: Frame, degraded: bool },
    /// One frame of a multi-frame preview that is still being generated.
    ProgressImage { image: Frame },
    /// The complete frame set, ordered by ascending timestamp.
    AnimationFrames { frames: Arc<[Frame]> },
    Failed { error: PreviewError },
    Unknown,
}

impl Preview {
    pub fn is_degraded(&self) -> bool {
        match self {
            Preview::Image { degraded, .. } => *degraded,
            Preview::ProgressImage { .. } => true,
            Preview::AnimationFrames { .. } | Preview::Failed { .. } | Preview::Unknown => false,
        }
    }

    /// Whether no further deliveries are expected for the request after this one.
    pub fn is_terminal(&self) -> bool {
        match self {
            Preview::Image { degraded, .. } => !*degraded,
            Preview::AnimationFrames { .. } | Preview::Failed { .. } => true,
            Preview::ProgressImage { .. } | Preview::Unknown => false,
        }
    }

    /// Single image carried by `Image` and `ProgressImage` payloads.
    pub fn image(&self) -> Option<&Frame> {
        match self {
            Preview::Image { image, .. } | Preview::ProgressImage { image } => Some(image),
            _ => None,
        }
    }

    pub fn frames(&self) -> Option<&[Frame]> {
        match self {
            Preview::AnimationFrames { frames } => Some(frames),
            _ => None,
        }
    }

    /// Suggested looping duration for an animation sampled every `frame_interval`.
    pub fn playback_duration(&self, frame_interval: Duration) -> Option<Duration> {
        self.frames()
            .map(|frames| frame_interval * (frames.len() as u32) * 3 / 2)
    }
}

/// A preview delivered to a caller, tagged with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResult {
    pub request_id: RequestId,
    pub preview: Preview,
}

impl PreviewResult {
    pub fn new(request_id: RequestId, preview: Preview) -> Self {
        Self {
            request_id,
            preview,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.preview.is_degraded()
    }
}

/// Callback receiving previews on the scheduler's delivery thread.
pub type ResultHandler = Arc<dyn Fn(PreviewResult) + Send + Sync>;
