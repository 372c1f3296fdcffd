//! Log-frequency bucketing of FFT bins

use rustfft::num_complex::Complex;
use std::ops::Range;

/// Ratio between the start bins of consecutive buckets
pub const BUCKET_GROWTH: f64 = 1.1;

/// Lowest normalization denominator, so quiet frames are not blown up
const MIN_NORMALIZER: f64 = 1.0;

/// Log of the squared magnitude of an FFT bin
fn log_power(bin: Complex<f64>) -> f64 {
    bin.norm_sqr().ln()
}

/// Collapses the lower half of a spectrum into geometrically widening
/// buckets, each holding the peak log power of its bins, normalized
/// against the loudest bucket of the frame.
///
/// Bucket ranges depend only on the FFT size and are computed once.
pub struct SpectrumReducer {
    ranges: Vec<Range<usize>>,
    buckets: Vec<f64>,
}

impl SpectrumReducer {
    pub fn new(fft_size: usize) -> Self {
        let ranges = bucket_ranges(fft_size / 2);
        let buckets = vec![0.0; ranges.len()];
        Self { ranges, buckets }
    }

    /// Number of buckets produced per frame
    pub fn bucket_count(&self) -> usize {
        self.ranges.len()
    }

    /// Bin range covered by each bucket
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Index of the bucket containing FFT bin `bin`, if any
    pub fn bucket_for_bin(&self, bin: usize) -> Option<usize> {
        self.ranges.iter().position(|r| r.contains(&bin))
    }

    /// Reduce one spectrum to normalized buckets.
    ///
    /// Each bucket starts at 0.0 and only rises for bins with positive log
    /// power, so silent or NaN bins leave it at zero. Bins past the ranges
    /// (the mirrored upper half) are ignored.
    pub fn reduce(&mut self, spectrum: &[Complex<f64>]) -> &[f64] {
        let mut max_amp = MIN_NORMALIZER;

        for (bucket, range) in self.buckets.iter_mut().zip(&self.ranges) {
            let end = range.end.min(spectrum.len());
            let start = range.start.min(end);
            let mut peak = 0.0;
            for &bin in &spectrum[start..end] {
                let power = log_power(bin);
                if power > peak {
                    peak = power;
                }
            }
            if peak > max_amp {
                max_amp = peak;
            }
            *bucket = peak;
        }

        for bucket in &mut self.buckets {
            *bucket /= max_amp;
        }

        &self.buckets
    }
}

/// Walk bins `1..half` geometrically: each bucket covers
/// `floor(f)..min(half, ceil(f * BUCKET_GROWTH))` and the next starts there.
fn bucket_ranges(half: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let limit = half as f64;
    let mut f = 1.0_f64;

    while f < limit {
        let f1 = (f * BUCKET_GROWTH).ceil();
        let start = f.floor() as usize;
        let end = (f1 as usize).min(half);
        ranges.push(start..end);
        f = f1;
    }

    ranges
}
