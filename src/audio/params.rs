//! Runtime-adjustable processing parameters shared with the audio thread

use super::{AudioConfig, PipelineError};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Step applied by one nudge of a parameter control
pub const ADJUST_STEP: f64 = 0.5;

/// Lowest smoothing rate reachable by nudging
const MIN_NUDGED_SMOOTHING_RATE: f64 = 1.0;

pub(super) fn check_gain(gain: f32) -> Result<(), PipelineError> {
    if gain.is_finite() && gain >= 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter {
            name: "gain",
            value: gain as f64,
        })
    }
}

pub(super) fn check_smoothing_rate(rate: f64) -> Result<(), PipelineError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::InvalidParameter {
            name: "smoothing_rate",
            value: rate,
        })
    }
}

/// Gain and smoothing rate, written by a control thread and read once per frame.
///
/// The audio thread only loads and the control thread only stores, so plain
/// relaxed atomics are enough; floats are kept as their bit patterns.
#[derive(Debug)]
pub struct ProcessingParams {
    gain: AtomicU32,
    smoothing_rate: AtomicU64,
}

impl ProcessingParams {
    pub fn new(gain: f32, smoothing_rate: f64) -> Result<Self, PipelineError> {
        check_gain(gain)?;
        check_smoothing_rate(smoothing_rate)?;
        Ok(Self {
            gain: AtomicU32::new(gain.to_bits()),
            smoothing_rate: AtomicU64::new(smoothing_rate.to_bits()),
        })
    }

    pub fn from_config(config: &AudioConfig) -> Result<Self, PipelineError> {
        Self::new(config.gain, config.smoothing_rate)
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn smoothing_rate(&self) -> f64 {
        f64::from_bits(self.smoothing_rate.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) -> Result<(), PipelineError> {
        check_gain(gain)?;
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    pub fn set_smoothing_rate(&self, rate: f64) -> Result<(), PipelineError> {
        check_smoothing_rate(rate)?;
        self.smoothing_rate.store(rate.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Nudge the gain by `delta`, never going below zero. Returns the new gain.
    pub fn adjust_gain(&self, delta: f64) -> f32 {
        let next = (self.gain() as f64 + delta).max(0.0) as f32;
        if next.is_finite() {
            self.gain.store(next.to_bits(), Ordering::Relaxed);
        }
        self.gain()
    }

    /// Nudge the smoothing rate by `delta`, never going below 1.0. Returns the new rate.
    pub fn adjust_smoothing_rate(&self, delta: f64) -> f64 {
        let next = (self.smoothing_rate() + delta).max(MIN_NUDGED_SMOOTHING_RATE);
        if next.is_finite() {
            self.smoothing_rate.store(next.to_bits(), Ordering::Relaxed);
        }
        self.smoothing_rate()
    }
}

impl Default for ProcessingParams {
    fn default() -> Self {
        let config = AudioConfig::default();
        Self {
            gain: AtomicU32::new(config.gain.to_bits()),
            smoothing_rate: AtomicU64::new(config.smoothing_rate.to_bits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn default_params_use_reference_values() {
        let params = ProcessingParams::default();

        assert_eq!(params.gain(), 2.0);
        assert_eq!(params.smoothing_rate(), 3.0);
    }

    #[test]
    fn setters_reject_non_finite_values() {
        let params = ProcessingParams::default();

        assert!(params.set_gain(f32::INFINITY).is_err());
        assert!(params.set_smoothing_rate(0.0).is_err());
        assert_eq!(params.gain(), 2.0);
        assert_eq!(params.smoothing_rate(), 3.0);

        params.set_gain(0.25).unwrap();
        params.set_smoothing_rate(12.0).unwrap();
        assert_eq!(params.gain(), 0.25);
        assert_eq!(params.smoothing_rate(), 12.0);
    }

    #[test]
    fn adjust_gain_clamps_at_zero() {
        let params = ProcessingParams::new(0.5, 3.0).unwrap();

        assert_eq!(params.adjust_gain(ADJUST_STEP), 1.0);
        assert_eq!(params.adjust_gain(-ADJUST_STEP * 5.0), 0.0);
    }

    #[test]
    fn adjust_smoothing_rate_clamps_at_one() {
        let params = ProcessingParams::new(2.0, 1.5).unwrap();

        assert_eq!(params.adjust_smoothing_rate(ADJUST_STEP), 2.0);
        assert_eq!(params.adjust_smoothing_rate(-10.0), 1.0);
    }

    #[test]
    fn writes_from_control_thread_are_visible_to_reader() {
        let params = Arc::new(ProcessingParams::default());
        let writer = params.clone();

        thread::spawn(move || {
            writer.set_gain(4.0).unwrap();
            writer.adjust_smoothing_rate(1.0);
        })
        .join()
        .unwrap();

        assert_eq!(params.gain(), 4.0);
        assert_eq!(params.smoothing_rate(), 4.0);
    }
}
