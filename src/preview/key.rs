//! Cache keys identifying one logical preview.

use std::fmt;

use super::types::{AssetHandle, RequestOptions, TargetSize};

const DEGRADED_SUFFIX: &str = ".degraded";

/// Deterministic key derived from asset, target size and options signature.
///
/// Requests with equal keys share cached results and in-flight work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(asset: &AssetHandle, size: TargetSize, options: &RequestOptions) -> Self {
        Self(format!("{}.{}.{}", asset.id(), size, options.signature()))
    }

    /// Key of the degraded placeholder for the same preview.
    pub fn degraded(&self) -> Self {
        if self.is_degraded() {
            return self.clone();
        }
        Self(format!("{}{}", self.0, DEGRADED_SUFFIX))
    }

    pub fn is_degraded(&self) -> bool {
        self.0.ends_with(DEGRADED_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
