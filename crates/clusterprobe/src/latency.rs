//! Smoothed round-trip estimation for the TCP probe.

use std::time::Duration;

/// Fold one measured cycle duration into the running estimate.
///
/// The first sample seeds the estimate directly. Later samples decay the old
/// estimate by `(n-1)/n` and weight the new measurement at `2/n`, where `n`
/// is the sample count after recording: the estimate chases recent latencies
/// while the window is still filling and settles once it is full.
pub fn smooth(estimate: Duration, duration: Duration, samples: usize) -> Duration {
    if estimate.is_zero() {
        return duration;
    }
    let n = samples.max(1) as u32;
    duration * 2 / n + estimate * (n - 1) / n
}
