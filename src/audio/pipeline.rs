//! Accumulate -> window/FFT -> bucket -> smooth -> deliver

use super::{
    AudioConfig, PipelineError, ProcessingParams, RingAccumulator, SpectralTransform,
    SpectrumReducer, TemporalSmoother,
};
use std::sync::Arc;
use std::time::Instant;

/// Receiver of each smoothed spectrum.
///
/// Called synchronously on the thread that delivers samples, so
/// implementations should only copy the data and flag a redraw.
pub trait SpectrumConsumer {
    fn on_spectrum(&mut self, spectrum: &[f64]);
}

impl<F: FnMut(&[f64])> SpectrumConsumer for F {
    fn on_spectrum(&mut self, spectrum: &[f64]) {
        self(spectrum)
    }
}

/// Streaming spectrum analyzer.
///
/// Feed it blocks of mono samples with [`push`](Self::push); each time a
/// full frame has accumulated it is transformed, bucketed and smoothed,
/// and the result is handed to the consumer before `push` returns.
pub struct SpectrumPipeline<C> {
    accumulator: RingAccumulator,
    transform: SpectralTransform,
    reducer: SpectrumReducer,
    smoother: TemporalSmoother,
    params: Arc<ProcessingParams>,
    consumer: C,
    last_frame: Instant,
    frames: u64,
}

impl<C: SpectrumConsumer> SpectrumPipeline<C> {
    /// Create a pipeline with its own parameter set taken from `config`
    pub fn new(config: &AudioConfig, consumer: C) -> Result<Self, PipelineError> {
        let params = Arc::new(ProcessingParams::from_config(config)?);
        Self::with_params(config, params, consumer)
    }

    /// Create a pipeline reading gain and smoothing rate from `params`
    pub fn with_params(
        config: &AudioConfig,
        params: Arc<ProcessingParams>,
        consumer: C,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let frame_len = config.frame_len();
        let accumulator = RingAccumulator::new(config.buffer_size, frame_len)?;
        let transform = SpectralTransform::new(frame_len)?;
        let reducer = SpectrumReducer::new(frame_len);
        let smoother = TemporalSmoother::new(reducer.bucket_count());

        log::debug!(
            "Spectrum pipeline: buffer {} samples, frame {} samples, {} buckets",
            config.buffer_size,
            frame_len,
            reducer.bucket_count()
        );

        Ok(Self {
            accumulator,
            transform,
            reducer,
            smoother,
            params,
            consumer,
            last_frame: Instant::now(),
            frames: 0,
        })
    }

    /// Shared handle for adjusting gain and smoothing from another thread
    pub fn params(&self) -> &Arc<ProcessingParams> {
        &self.params
    }

    pub fn frame_len(&self) -> usize {
        self.accumulator.frame_len()
    }

    pub fn bucket_count(&self) -> usize {
        self.reducer.bucket_count()
    }

    /// Samples waiting for the next frame
    pub fn buffered(&self) -> usize {
        self.accumulator.buffered()
    }

    /// Frames analyzed since creation
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Current smoothed spectrum
    pub fn smoothed(&self) -> &[f64] {
        self.smoother.state()
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// Deliver a block of samples, timing the frame against the wall clock.
    pub fn push(&mut self, samples: &[f32]) -> Result<bool, PipelineError> {
        self.push_at(samples, Instant::now())
    }

    /// Deliver a block of any length, split into frame-sized pushes.
    ///
    /// Each piece holds at most one frame, so the buffered tail plus the
    /// piece always fits and no samples are dropped however large the
    /// device block is. Returns the number of frames analyzed.
    pub fn push_block(&mut self, samples: &[f32]) -> Result<usize, PipelineError> {
        self.push_block_at(samples, Instant::now())
    }

    /// [`push_block`](Self::push_block) with every piece timed at `now`
    pub fn push_block_at(
        &mut self,
        samples: &[f32],
        now: Instant,
    ) -> Result<usize, PipelineError> {
        let frame_len = self.frame_len();
        let mut analyzed = 0;
        for chunk in samples.chunks(frame_len) {
            if self.push_at(chunk, now)? {
                analyzed += 1;
            }
        }
        Ok(analyzed)
    }

    /// Deliver a block of samples captured at `now`.
    ///
    /// Returns whether a frame was analyzed. On
    /// [`PipelineError::BufferOverrun`] the samples that fit were still
    /// accepted and a frame may have been delivered.
    pub fn push_at(&mut self, samples: &[f32], now: Instant) -> Result<bool, PipelineError> {
        let Self {
            accumulator,
            transform,
            reducer,
            smoother,
            params,
            consumer,
            last_frame,
            frames,
        } = self;

        let analyzed = accumulator.push(samples, |frame| -> Result<(), PipelineError> {
            let gain = params.gain();
            let rate = params.smoothing_rate();

            let (spectrum, replaced) = transform.transform(frame, gain)?;
            if replaced > 0 {
                log::debug!("Replaced {} non-finite samples with silence", replaced);
            }
            let buckets = reducer.reduce(spectrum);

            let elapsed = now.saturating_duration_since(*last_frame).as_secs_f64();
            *last_frame = now;

            let smoothed = smoother.smooth(buckets, elapsed, rate);
            consumer.on_spectrum(smoothed);
            *frames += 1;

            log::trace!("Frame {}: dt {:.4}s, gain {}, rate {}", frames, elapsed, gain, rate);
            Ok(())
        })?;

        match analyzed {
            Some(result) => result.map(|_| true),
            None => Ok(false),
        }
    }
}
