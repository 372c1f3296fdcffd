//! Time-weighted smoothing of the reduced spectrum across frames

/// Exponential follower over a fixed number of buckets.
///
/// Each call moves every bucket toward the new reading by
/// `rate * elapsed_secs` of the remaining distance, so the perceived speed
/// does not depend on how often frames arrive. No clamping is applied:
/// with `rate * elapsed_secs > 1` the state overshoots, and above 2 it
/// diverges.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    state: Vec<f64>,
}

impl TemporalSmoother {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            state: vec![0.0; bucket_count],
        }
    }

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    /// Step the smoothed state toward `target` and return it.
    ///
    /// Only the overlapping prefix is updated if the lengths differ.
    pub fn smooth(&mut self, target: &[f64], elapsed_secs: f64, rate: f64) -> &[f64] {
        debug_assert_eq!(target.len(), self.state.len());

        let step = rate * elapsed_secs;
        for (current, &reading) in self.state.iter_mut().zip(target) {
            *current += (reading - *current) * step;
        }

        &self.state
    }
}
