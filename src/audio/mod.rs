//! Audio capture and spectrum analysis module

mod accumulator;
mod capture;
mod fft;
mod params;
mod pipeline;
mod reducer;
mod smoother;

pub use accumulator::RingAccumulator;
pub use capture::{CaptureError, SpectrumCapture};
pub use fft::{hann_window, SpectralTransform};
pub use params::{ProcessingParams, ADJUST_STEP};
pub use pipeline::{SpectrumConsumer, SpectrumPipeline};
pub use reducer::{SpectrumReducer, BUCKET_GROWTH};
pub use smoother::TemporalSmoother;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spectrum pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Frame size must be a power of two, got {0}")]
    NotPowerOfTwo(usize),

    #[error("Buffer size {0} is too small (minimum 4)")]
    FrameTooSmall(usize),

    #[error("Frame length mismatch: expected {expected}, got {actual}")]
    FrameLengthMismatch { expected: usize, actual: usize },

    #[error("Buffer overrun: dropped {dropped} samples (capacity {capacity})")]
    BufferOverrun { dropped: usize, capacity: usize },

    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Audio processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample buffer capacity; the analysis frame is half of it
    pub buffer_size: usize,

    /// Input gain multiplier applied before the FFT
    pub gain: f32,

    /// Smoothing rate (larger = snappier)
    pub smoothing_rate: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            gain: 2.0,
            smoothing_rate: 3.0,
        }
    }
}

impl AudioConfig {
    /// Number of samples analyzed per frame
    pub fn frame_len(&self) -> usize {
        self.buffer_size / 2
    }

    /// Check the configuration before any buffers are sized from it
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.buffer_size.is_power_of_two() {
            return Err(PipelineError::NotPowerOfTwo(self.buffer_size));
        }
        if self.buffer_size < 4 {
            return Err(PipelineError::FrameTooSmall(self.buffer_size));
        }
        params::check_gain(self.gain)?;
        params::check_smoothing_rate(self.smoothing_rate)?;
        Ok(())
    }

    /// Parse a JSON configuration; omitted fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
