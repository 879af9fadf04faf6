//! Preview scheduling and caching
//!
//! [`PreviewScheduler`] accepts preview requests, serves repeats from the
//! [`ResultCache`], and runs at most one multi-frame video decode at a time.
//! [`PreviewWarmer`] pre-warms the cache for batches of assets. Decoding
//! itself is delegated to a [`FrameDecoder`].

pub mod cache;
pub mod decoder;
pub mod error;
pub mod key;
mod queue;
pub mod sampling;
pub mod scheduler;
pub mod synthetic;
pub mod types;
pub mod warm;
pub mod worker;

pub use cache::ResultCache;
pub use decoder::{DecodeEvent, FrameDecoder, FrameSink, SessionId, VideoSource};
pub use error::PreviewError;
pub use key::CacheKey;
pub use sampling::sample_timestamps;
pub use scheduler::{PreviewScheduler, SchedulerStats};
pub use synthetic::SyntheticDecoder;
pub use types::{
    AssetHandle, Frame, MediaKind, Preview, PreviewResult, RequestId, RequestOptions,
    ResultHandler, TargetSize,
};
pub use warm::PreviewWarmer;
