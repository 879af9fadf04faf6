//! Sample timestamps for multi-frame video previews.

use std::time::Duration;

/// Tolerance for float noise when comparing slice positions with the coverage.
const COVERAGE_EPSILON: f64 = 1e-9;

/// Compute the timestamps (in seconds) to decode for a video preview.
///
/// The duration is split into `floor(duration / interval)` equal slices.
/// Slice `n` starts at `n * step` and is kept when it ends within the covered
/// fraction, `(n + 1) / slices <= coverage`. Slice 0 is always kept, so the
/// result is never empty.
pub fn sample_timestamps(duration: Duration, interval: Duration, coverage: f64) -> Vec<f64> {
    let duration = duration.as_secs_f64();
    let interval = interval.as_secs_f64();
    if duration <= 0.0 || interval <= 0.0 {
        return vec![0.0];
    }

    let slices = (duration / interval).floor() as usize;
    if slices == 0 {
        return vec![0.0];
    }

    let step = duration / slices as f64;
    (0..slices)
        .filter(|&n| n == 0 || (n + 1) as f64 / slices as f64 <= coverage + COVERAGE_EPSILON)
        .map(|n| n as f64 * step)
        .collect()
}
