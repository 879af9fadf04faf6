//! Preview generation errors.

/// Errors reported by a [`FrameDecoder`](super::FrameDecoder) and surfaced by
/// the scheduler.
///
/// A cache miss is not an error; lookups return `Option::None` instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreviewError {
    #[error("No decodable source for asset '{asset_id}': {reason}")]
    DecoderUnavailable { asset_id: String, reason: String },

    #[error("Failed to decode frame of asset '{asset_id}'{}: {reason}", at_timestamp(.timestamp))]
    FrameDecodeFailed {
        asset_id: String,
        timestamp: Option<f64>,
        reason: String,
    },
}

fn at_timestamp(timestamp: &Option<f64>) -> String {
    match timestamp {
        Some(t) => format!(" at {:.3}s", t),
        None => String::new(),
    }
}

impl PreviewError {
    /// Identifier of the asset the error refers to.
    pub fn asset_id(&self) -> &str {
        match self {
            PreviewError::DecoderUnavailable { asset_id, .. } => asset_id,
            PreviewError::FrameDecodeFailed { asset_id, .. } => asset_id,
        }
    }
}
