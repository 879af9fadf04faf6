//! Cache warming for assets that are about to be shown
//!
//! A [`PreviewWarmer`] issues ordinary scheduler requests and remembers which
//! ones it started, so the batch can be cancelled when the assets scroll
//! away. Generated previews land in the shared cache either way.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::key::CacheKey;
use super::scheduler::PreviewScheduler;
use super::types::{AssetHandle, RequestId, RequestOptions, TargetSize};

/// A warm request that has not finished yet.
struct Tracked {
    asset: AssetHandle,
    key: CacheKey,
}

type Registry = Arc<Mutex<HashMap<RequestId, Tracked>>>;

/// Bookkeeping wrapper that pre-warms the scheduler's cache.
///
/// Entries are tracked by cache key: a warm request that a newer caller
/// took over is settled as soon as the shared preview reaches the cache.
pub struct PreviewWarmer {
    scheduler: PreviewScheduler,
    outstanding: Registry,
}

impl PreviewWarmer {
    pub fn new(scheduler: PreviewScheduler) -> Self {
        Self {
            scheduler,
            outstanding: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Request previews for every asset, tracking the ones that miss the cache.
    ///
    /// An entry is dropped once a final result for its preview is delivered.
    pub fn start_warm(&self, assets: &[AssetHandle], size: TargetSize, options: &RequestOptions) {
        // Held across each request so a fast completion can't run before the entry exists
        let mut outstanding = lock(&self.outstanding);
        for asset in assets {
            let key = CacheKey::new(asset, size, options);
            let registry = Arc::clone(&self.outstanding);
            let finished = key.clone();
            let request = self
                .scheduler
                .request_preview(asset, size, options, move |result| {
                    if result.preview.is_terminal() {
                        lock(&registry).retain(|_, tracked| tracked.key != finished);
                    }
                });
            if let Some(id) = request {
                outstanding.insert(
                    id,
                    Tracked {
                        asset: asset.clone(),
                        key,
                    },
                );
            }
        }
        debug!(
            requested = assets.len(),
            outstanding = outstanding.len(),
            "Started warming previews"
        );
    }

    /// Cancel the outstanding warm requests for `assets`.
    pub fn stop_warm(&self, assets: &[AssetHandle]) {
        let mut outstanding = lock(&self.outstanding);
        let ids: Vec<RequestId> = outstanding
            .iter()
            .filter(|(_, tracked)| assets.iter().any(|a| a.id() == tracked.asset.id()))
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            self.scheduler.cancel_request(&id);
            outstanding.remove(&id);
        }
    }

    /// Cancel every outstanding warm request.
    pub fn stop_all(&self) {
        let mut outstanding = lock(&self.outstanding);
        for id in outstanding.keys() {
            self.scheduler.cancel_request(id);
        }
        debug!(cancelled = outstanding.len(), "Stopped warming previews");
        outstanding.clear();
    }

    /// Outstanding warm request for an asset, if any.
    pub fn request_id_for_asset(&self, asset: &AssetHandle) -> Option<RequestId> {
        self.settled()
            .iter()
            .find(|(_, tracked)| tracked.asset.id() == asset.id())
            .map(|(id, _)| id.clone())
    }

    /// Number of warm requests that have not finished or been stopped.
    pub fn outstanding(&self) -> usize {
        self.settled().len()
    }

    pub fn scheduler(&self) -> &PreviewScheduler {
        &self.scheduler
    }

    /// Registry without entries whose preview was finished for another caller.
    fn settled(&self) -> MutexGuard<'_, HashMap<RequestId, Tracked>> {
        let mut outstanding = lock(&self.outstanding);
        let cache = self.scheduler.cache();
        outstanding.retain(|_, tracked| !cache.contains(&tracked.key));
        outstanding
    }
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<RequestId, Tracked>> {
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
