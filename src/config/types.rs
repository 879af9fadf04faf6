//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::preview::cache::DEFAULT_CAPACITY;
use crate::preview::worker::DEFAULT_POOL_SIZE;
use crate::preview::RequestOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Result cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of previews kept before the least recently used is evicted
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

pub fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Threads running stills, single frames and source opening
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Position of the degraded placeholder frame, in milliseconds
    #[serde(default = "default_degraded_offset_ms")]
    pub degraded_offset_ms: u64,
    /// Deliver a `Failed` preview instead of staying silent on decode errors
    #[serde(default)]
    pub report_failures: bool,
}

pub fn default_worker_threads() -> usize {
    DEFAULT_POOL_SIZE
}

pub fn default_degraded_offset_ms() -> u64 {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            degraded_offset_ms: default_degraded_offset_ms(),
            report_failures: false,
        }
    }
}

impl SchedulerConfig {
    pub fn degraded_offset(&self) -> Duration {
        Duration::from_millis(self.degraded_offset_ms)
    }
}

/// Default request options used by the CLI and by consumers that don't
/// build their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub allow_network_fetch: bool,
    #[serde(default = "default_true")]
    pub want_degraded_first: bool,
    #[serde(default = "default_true")]
    pub want_progressive_frames: bool,
    /// Spacing between sampled video frames, in milliseconds
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Fraction of the video duration to sample, from the start
    #[serde(default = "default_coverage_fraction")]
    pub coverage_fraction: f64,
}

pub fn default_true() -> bool {
    true
}

pub fn default_frame_interval_ms() -> u64 {
    100
}

pub fn default_coverage_fraction() -> f64 {
    1.0
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            allow_network_fetch: false,
            want_degraded_first: true,
            want_progressive_frames: true,
            frame_interval_ms: default_frame_interval_ms(),
            coverage_fraction: default_coverage_fraction(),
        }
    }
}

impl DefaultsConfig {
    /// Build request options from the configured defaults.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::default()
            .with_network_fetch(self.allow_network_fetch)
            .with_degraded_first(self.want_degraded_first)
            .with_progressive_frames(self.want_progressive_frames)
            .with_frame_interval(Duration::from_millis(self.frame_interval_ms))
            .with_coverage_fraction(self.coverage_fraction)
    }
}

impl Config {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache.capacity == 0 {
            return Err("cache.capacity must be > 0".to_string());
        }
        if self.scheduler.worker_threads == 0 {
            return Err("scheduler.worker_threads must be > 0".to_string());
        }
        if self.scheduler.worker_threads > 64 {
            return Err(format!(
                "scheduler.worker_threads {} exceeds maximum (64)",
                self.scheduler.worker_threads
            ));
        }
        if self.defaults.frame_interval_ms == 0 {
            return Err("defaults.frame_interval_ms must be > 0".to_string());
        }
        let coverage = self.defaults.coverage_fraction;
        if !(coverage > 0.0 && coverage <= 1.0) {
            return Err(format!(
                "defaults.coverage_fraction {} must be in (0, 1]",
                coverage
            ));
        }
        Ok(())
    }
}
