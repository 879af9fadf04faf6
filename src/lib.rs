//! Asset preview library
//!
//! Generates and caches previews (stills, degraded placeholders, progressive
//! frames and full animations) for media that is expensive to decode.

pub mod config;
pub mod preview;

pub use config::Config;
pub use preview::{
    AssetHandle, Frame, FrameDecoder, Preview, PreviewError, PreviewResult, PreviewScheduler,
    PreviewWarmer, RequestId, RequestOptions, ResultCache, SyntheticDecoder, TargetSize,
};
