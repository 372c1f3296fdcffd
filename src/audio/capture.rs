//! Audio capture implementation using a dedicated thread

use super::{AudioConfig, PipelineError, ProcessingParams, SpectrumConsumer, SpectrumPipeline};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig, SupportedStreamConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Audio capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No input device found")]
    NoInputDevice,

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    StreamError(String),

    #[error("Failed to start stream: {0}")]
    PlayError(String),

    #[error("Thread error: {0}")]
    ThreadError(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Commands sent to the audio thread
enum AudioCommand {
    Stop,
}

/// Running capture feeding a [`SpectrumPipeline`].
///
/// The cpal stream is not `Send` on every host, so it lives on a dedicated
/// thread; this handle only keeps the command channel, the join handle and
/// the shared parameters.
pub struct SpectrumCapture {
    command_tx: mpsc::Sender<AudioCommand>,
    thread_handle: Option<JoinHandle<()>>,
    params: Arc<ProcessingParams>,
    sample_rate: u32,
}

impl SpectrumCapture {
    /// Open the default audio source and start delivering spectra to `consumer`.
    ///
    /// Where the host supports it this records what the default output device
    /// is playing; otherwise the default input device is used.
    ///
    /// Returns once the stream is playing, or with the error that stopped it.
    pub fn start<C>(config: &AudioConfig, consumer: C) -> Result<Self, CaptureError>
    where
        C: SpectrumConsumer + Send + 'static,
    {
        let params = Arc::new(ProcessingParams::from_config(config)?);
        let pipeline = SpectrumPipeline::with_params(config, params.clone(), consumer)?;

        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || run_audio_thread(pipeline, command_rx, ready_tx))
            .map_err(|e| CaptureError::ThreadError(e.to_string()))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(CaptureError::ThreadError(
                    "audio thread exited before starting".to_string(),
                ));
            }
        };

        Ok(Self {
            command_tx,
            thread_handle: Some(thread_handle),
            params,
            sample_rate,
        })
    }

    /// Shared gain and smoothing rate
    pub fn params(&self) -> &Arc<ProcessingParams> {
        &self.params
    }

    /// Device sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stop the audio capture
    pub fn stop(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SpectrumCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Own the stream for its whole life; report startup, then wait for Stop
fn run_audio_thread<C>(
    pipeline: SpectrumPipeline<C>,
    command_rx: mpsc::Receiver<AudioCommand>,
    ready_tx: mpsc::Sender<Result<u32, CaptureError>>,
) where
    C: SpectrumConsumer + Send + 'static,
{
    let stream = match open_stream(pipeline) {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            stream
        }
        Err(e) => {
            log::error!("Audio thread error: {}", e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    log::info!("Audio capture started");

    // Blocks until Stop arrives or the handle is dropped
    match command_rx.recv() {
        Ok(AudioCommand::Stop) => log::info!("Audio capture stopping"),
        Err(_) => log::info!("Audio capture channel disconnected"),
    }

    drop(stream);
}

/// Where samples come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureSource {
    /// What the default output device is playing
    Loopback,
    /// The default input device
    Input,
}

/// Whether the host can record an output device as an input stream
fn host_supports_loopback() -> bool {
    cfg!(target_os = "windows")
}

/// Sources to try, most preferred first
fn source_order(loopback_supported: bool) -> &'static [CaptureSource] {
    if loopback_supported {
        &[CaptureSource::Loopback, CaptureSource::Input]
    } else {
        &[CaptureSource::Input]
    }
}

/// Prefer loopback of the default output device, falling back to the default input
fn select_device(
    host: &cpal::Host,
) -> Result<(Device, SupportedStreamConfig, CaptureSource), CaptureError> {
    for &source in source_order(host_supports_loopback()) {
        match source {
            CaptureSource::Loopback => {
                let Some(device) = host.default_output_device() else {
                    log::warn!("No output device for loopback");
                    continue;
                };
                // Loopback records in the format the device is playing
                match device.default_output_config() {
                    Ok(config) => return Ok((device, config, source)),
                    Err(e) => log::warn!("Loopback config unavailable: {}", e),
                }
            }
            CaptureSource::Input => {
                if let Some(device) = host.default_input_device() {
                    let config = device
                        .default_input_config()
                        .map_err(|e| CaptureError::ConfigError(e.to_string()))?;
                    return Ok((device, config, source));
                }
            }
        }
    }

    Err(CaptureError::NoInputDevice)
}

fn open_stream<C>(pipeline: SpectrumPipeline<C>) -> Result<(cpal::Stream, u32), CaptureError>
where
    C: SpectrumConsumer + Send + 'static,
{
    let host = cpal::default_host();
    let (device, config, source) = select_device(&host)?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    log::info!(
        "Audio capture ({:?}): {} ({} Hz, {} channels, frame {} samples)",
        source,
        device.name().unwrap_or_else(|_| "Unknown".to_string()),
        sample_rate,
        channels,
        pipeline.frame_len()
    );

    let stream = match config.sample_format() {
        SampleFormat::F32 => build_stream::<f32, C>(&device, &config.into(), pipeline, channels),
        SampleFormat::I16 => build_stream::<i16, C>(&device, &config.into(), pipeline, channels),
        SampleFormat::U16 => build_stream::<u16, C>(&device, &config.into(), pipeline, channels),
        _ => {
            return Err(CaptureError::ConfigError(
                "Unsupported sample format".to_string(),
            ))
        }
    }
    .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::PlayError(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Build audio stream for given sample type; the pipeline runs inside the callback
fn build_stream<T, C>(
    device: &Device,
    config: &StreamConfig,
    mut pipeline: SpectrumPipeline<C>,
    channels: usize,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample,
    f32: cpal::FromSample<T>,
    C: SpectrumConsumer + Send + 'static,
{
    let mut mono: Vec<f32> = Vec::with_capacity(pipeline.frame_len());

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            downmix_into(data, channels, &mut mono);

            // Device blocks can be any length; split them so none overrun
            if let Err(e) = pipeline.push_block(&mono) {
                log::warn!("Spectrum pipeline: {}", e);
            }
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )
}

/// Average interleaved frames down to mono f32, reusing `mono`
fn downmix_into<T>(data: &[T], channels: usize, mono: &mut Vec<f32>)
where
    T: cpal::Sample,
    f32: cpal::FromSample<T>,
{
    let channels = channels.max(1);
    mono.clear();
    mono.extend(data.chunks(channels).map(|frame| {
        let sum: f32 = frame
            .iter()
            .map(|&s| <f32 as cpal::Sample>::from_sample(s))
            .sum();
        sum / frame.len() as f32
    }));
}

#[cfg(test)]
mod tests {
    use super::{downmix_into, source_order, CaptureSource};

    #[test]
    fn loopback_is_tried_before_input_when_supported() {
        assert_eq!(
            source_order(true),
            &[CaptureSource::Loopback, CaptureSource::Input]
        );
        assert_eq!(source_order(false), &[CaptureSource::Input]);
    }

    #[test]
    fn downmix_averages_interleaved_channels() {
        let mut mono = Vec::new();

        downmix_into(&[1.0f32, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut mono);

        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through_and_reuses_buffer() {
        let mut mono = vec![9.0; 16];

        downmix_into(&[0.25f32, -0.25], 1, &mut mono);

        assert_eq!(mono, vec![0.25, -0.25]);
    }

    #[test]
    fn downmix_converts_integer_samples() {
        let mut mono = Vec::new();

        downmix_into(&[i16::MAX, i16::MAX, 0i16, 0], 2, &mut mono);

        assert!((mono[0] - 1.0).abs() < 1e-3);
        assert_eq!(mono[1], 0.0);
    }
}
