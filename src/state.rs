//! Latest-spectrum handoff between the audio thread and its owner

use crate::audio::SpectrumConsumer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Spectrum and its frame number, updated together
struct Latest {
    spectrum: Vec<f64>,
    frame: u64,
}

struct Shared {
    latest: Mutex<Latest>,
    updated: AtomicBool,
}

/// Most recent smoothed spectrum plus a redraw-requested flag.
///
/// The audio thread publishes into it (brief lock, copy only); the owning
/// thread polls [`take_if_updated`](Self::take_if_updated) at its own
/// cadence and redraws when something new arrived. Clones share the slot.
#[derive(Clone)]
pub struct SharedSpectrum {
    inner: Arc<Shared>,
}

impl SharedSpectrum {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                latest: Mutex::new(Latest {
                    spectrum: Vec::new(),
                    frame: 0,
                }),
                updated: AtomicBool::new(false),
            }),
        }
    }

    /// Replace the stored spectrum and request a redraw
    pub fn publish(&self, spectrum: &[f64]) {
        {
            let mut latest = self.inner.latest.lock();
            latest.spectrum.clear();
            latest.spectrum.extend_from_slice(spectrum);
            latest.frame += 1;
        }
        self.inner.updated.store(true, Ordering::Release);
    }

    /// Copy of the most recent spectrum (empty before the first frame)
    pub fn latest(&self) -> Vec<f64> {
        self.inner.latest.lock().spectrum.clone()
    }

    /// Latest spectrum if one was published since the last call
    pub fn take_if_updated(&self) -> Option<Vec<f64>> {
        self.take_frame_if_updated().map(|(_, spectrum)| spectrum)
    }

    /// Like [`take_if_updated`](Self::take_if_updated), paired with the
    /// 1-based number of the frame that produced the spectrum
    pub fn take_frame_if_updated(&self) -> Option<(u64, Vec<f64>)> {
        if !self.inner.updated.swap(false, Ordering::Acquire) {
            return None;
        }
        let latest = self.inner.latest.lock();
        Some((latest.frame, latest.spectrum.clone()))
    }

    /// Number of spectra published so far
    pub fn frame_count(&self) -> u64 {
        self.inner.latest.lock().frame
    }
}

impl Default for SharedSpectrum {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumConsumer for SharedSpectrum {
    fn on_spectrum(&mut self, spectrum: &[f64]) {
        self.publish(spectrum);
    }
}
