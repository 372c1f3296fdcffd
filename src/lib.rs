//! Live Spectrum Library
//!
//! Captures a live audio stream and turns each block of samples into a
//! smoothed, log-frequency magnitude spectrum for visualization.

pub mod audio;
pub mod control;
pub mod state;

use audio::{AudioConfig, CaptureError, PipelineError, SpectrumCapture};
use control::ControlCommand;
use state::SharedSpectrum;

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an optional JSON config file
pub const CONFIG_ENV: &str = "LIVE_SPECTRUM_CONFIG";

/// How often the owner thread checks for a new spectrum
const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Seconds between summary log lines
const REPORT_SECONDS: f64 = 1.0;

/// Top-level application errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read config {path}: {message}")]
    ConfigRead { path: String, message: String },

    #[error(transparent)]
    Config(#[from] PipelineError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Load the config named by `LIVE_SPECTRUM_CONFIG`, or the defaults
pub fn load_config() -> Result<AudioConfig, AppError> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| AppError::ConfigRead {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let config = AudioConfig::from_json(&json)?;
            log::info!("Loaded config from {}", path);
            Ok(config)
        }
        Err(_) => Ok(AudioConfig::default()),
    }
}

/// Strongest bucket of a spectrum as `(index, value)`
pub fn strongest_bucket(spectrum: &[f64]) -> Option<(usize, f64)> {
    spectrum
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Number of frames analyzed in about [`REPORT_SECONDS`], at least one
pub fn report_interval(sample_rate: u32, frame_len: usize) -> u64 {
    let frames_per_second = sample_rate as f64 / frame_len.max(1) as f64;
    ((frames_per_second * REPORT_SECONDS).round() as u64).max(1)
}

/// Read control commands from stdin until EOF or `q`
fn spawn_control_thread(tx: mpsc::Sender<ControlCommand>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("control".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match ControlCommand::parse(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => log::warn!("Unknown command: {:?} (use g+ g- s+ s- q)", line.trim()),
                }
            }
        })
        .map(|_| ())
}

/// Run the analyzer until `q` is entered
pub fn run() -> Result<(), AppError> {
    env_logger::init();

    let config = load_config()?;
    let shared = SharedSpectrum::new();
    let mut capture = SpectrumCapture::start(&config, shared.clone())?;
    let params = capture.params().clone();

    log::info!(
        "Capturing at {} Hz: gain {}, smoothing rate {}",
        capture.sample_rate(),
        params.gain(),
        params.smoothing_rate()
    );

    let report_every = report_interval(capture.sample_rate(), config.frame_len());
    let mut next_report = report_every;

    let (command_tx, command_rx) = mpsc::channel();
    if let Err(e) = spawn_control_thread(command_tx) {
        log::warn!("Control input unavailable: {}", e);
    }

    loop {
        // stdin closing just leaves the current settings in place
        if let Ok(command) = command_rx.try_recv() {
            if !command.apply(&params) {
                log::info!("Quit requested");
                break;
            }
        }

        if let Some((frame, spectrum)) = shared.take_frame_if_updated() {
            // Polling can skip frames, so report on crossing the mark
            if frame >= next_report {
                next_report = frame + report_every;
                if let Some((index, value)) = strongest_bucket(&spectrum) {
                    log::info!(
                        "Frame {}: {} buckets, strongest #{} at {:.3}",
                        frame,
                        spectrum.len(),
                        index,
                        value
                    );
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }

    capture.stop();
    Ok(())
}
