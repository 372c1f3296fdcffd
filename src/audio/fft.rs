//! Windowing and radix-2 FFT of analysis frames

use super::PipelineError;
use rustfft::num_complex::Complex;
use std::f64::consts::PI;

/// Hann window coefficient for `index` of a `size`-sample frame
pub fn hann_window(index: usize, size: usize) -> f64 {
    if size <= 1 {
        return 1.0;
    }
    0.5 - 0.5 * (2.0 * PI * index as f64 / (size - 1) as f64).cos()
}

/// Hann-windowed forward FFT over a fixed power-of-two frame length.
///
/// Window coefficients and twiddle factors are computed once; every call
/// overwrites the same output buffer, so nothing is allocated per frame.
pub struct SpectralTransform {
    size: usize,
    window: Vec<f64>,
    twiddles: Vec<Complex<f64>>,
    windowed: Vec<f64>,
    output: Vec<Complex<f64>>,
}

impl SpectralTransform {
    pub fn new(size: usize) -> Result<Self, PipelineError> {
        if !size.is_power_of_two() {
            return Err(PipelineError::NotPowerOfTwo(size));
        }

        let window = (0..size).map(|i| hann_window(i, size)).collect();

        // exp(-2*pi*i*k/N) for k in [0, N/2); a sub-transform of length n
        // uses every (N/n)-th entry.
        let twiddles = (0..size / 2)
            .map(|k| Complex::from_polar(1.0, -2.0 * PI * k as f64 / size as f64))
            .collect();

        Ok(Self {
            size,
            window,
            twiddles,
            windowed: vec![0.0; size],
            output: vec![Complex::new(0.0, 0.0); size],
        })
    }

    /// Window `frame`, scale it by `gain` and transform it.
    ///
    /// Non-finite samples are treated as silence; the number replaced is
    /// returned alongside the spectrum.
    pub fn transform(
        &mut self,
        frame: &[f32],
        gain: f32,
    ) -> Result<(&[Complex<f64>], usize), PipelineError> {
        self.check_len(frame.len())?;

        let gain = gain as f64;
        let mut replaced = 0;
        for ((out, &sample), &w) in self.windowed.iter_mut().zip(frame).zip(&self.window) {
            let sample = if sample.is_finite() {
                sample as f64
            } else {
                replaced += 1;
                0.0
            };
            *out = sample * w * gain;
        }

        fft_recursive(&self.windowed, 0, 1, &mut self.output, &self.twiddles);
        Ok((self.output.as_slice(), replaced))
    }

    /// Plain FFT of `input` with no window or gain
    pub fn fft(&mut self, input: &[f64]) -> Result<&[Complex<f64>], PipelineError> {
        self.check_len(input.len())?;
        fft_recursive(input, 0, 1, &mut self.output, &self.twiddles);
        Ok(self.output.as_slice())
    }

    fn check_len(&self, actual: usize) -> Result<(), PipelineError> {
        if actual != self.size {
            return Err(PipelineError::FrameLengthMismatch {
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }
}

/// Decimation-in-time Cooley-Tukey over the strided view
/// `input[offset], input[offset + stride], ...` of length `out.len()`.
///
/// The even half lands in `out[..n/2]`, the odd half in `out[n/2..]`, then
/// the butterfly combines them in place. `stride` doubles per level, which
/// is also the step through the full-size twiddle table.
fn fft_recursive(
    input: &[f64],
    offset: usize,
    stride: usize,
    out: &mut [Complex<f64>],
    twiddles: &[Complex<f64>],
) {
    let n = out.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        out[0] = Complex::new(input[offset], 0.0);
        return;
    }

    let half = n / 2;
    {
        let (even, odd) = out.split_at_mut(half);
        fft_recursive(input, offset, stride * 2, even, twiddles);
        fft_recursive(input, offset + stride, stride * 2, odd, twiddles);
    }

    for k in 0..half {
        let e = out[k];
        let t = twiddles[k * stride] * out[k + half];
        out[k] = e + t;
        out[k + half] = e - t;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    fn direct_dft(input: &[f64]) -> Vec<Complex<f64>> {
        let n = input.len();
        (0..n)
            .map(|k| {
                input
                    .iter()
                    .enumerate()
                    .map(|(j, &x)| {
                        let angle = -2.0 * PI * ((k * j) % n) as f64 / n as f64;
                        Complex::from_polar(x, angle)
                    })
                    .sum::<Complex<f64>>()
            })
            .collect()
    }

    fn test_signal(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                (0.37 * t).sin() + 0.5 * (1.91 * t + 0.3).cos() + 0.01 * (i % 7) as f64
            })
            .collect()
    }

    fn assert_spectra_close(actual: &[Complex<f64>], expected: &[Complex<f64>], rel: f64) {
        assert_eq!(actual.len(), expected.len());
        let scale = expected.iter().map(|c| c.norm()).fold(1.0, f64::max);
        for (k, (a, e)) in actual.iter().zip(expected).enumerate() {
            let err = (a - e).norm();
            assert!(
                err <= rel * scale,
                "bin {k}: got {a}, expected {e} (error {err})"
            );
        }
    }

    #[test]
    fn test_hann_window() {
        let size = 1024;

        assert!(hann_window(0, size).abs() < 1e-12);
        assert!(hann_window(size - 1, size).abs() < 1e-12);
        assert!((hann_window(size / 2, size) - 1.0).abs() < 1e-4);

        // Odd length has an exact centre sample
        assert!((hann_window(4, 9) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn new_rejects_non_power_of_two() {
        assert_eq!(
            SpectralTransform::new(1000).err(),
            Some(PipelineError::NotPowerOfTwo(1000))
        );
        assert_eq!(
            SpectralTransform::new(0).err(),
            Some(PipelineError::NotPowerOfTwo(0))
        );
    }

    #[test]
    fn fft_matches_direct_dft() {
        for &n in &[1usize, 2, 4, 8, 1024, 4096] {
            let input = test_signal(n);
            let mut transform = SpectralTransform::new(n).unwrap();

            let actual = transform.fft(&input).unwrap().to_vec();

            assert_spectra_close(&actual, &direct_dft(&input), 1e-9);
        }
    }

    #[test]
    fn fft_matches_rustfft() {
        let n = 2048;
        let input = test_signal(n);
        let mut transform = SpectralTransform::new(n).unwrap();
        let actual = transform.fft(&input).unwrap().to_vec();

        let mut expected: Vec<Complex<f64>> =
            input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut expected);

        assert_spectra_close(&actual, &expected, 1e-9);
    }

    #[test]
    fn fft_is_linear() {
        let n = 256;
        let x = test_signal(n);
        let y: Vec<f64> = (0..n).map(|i| ((i * 13) % 17) as f64 - 8.0).collect();
        let (a, b) = (2.5, -0.75);
        let mut transform = SpectralTransform::new(n).unwrap();

        let fx = transform.fft(&x).unwrap().to_vec();
        let fy = transform.fft(&y).unwrap().to_vec();
        let combined: Vec<f64> = x.iter().zip(&y).map(|(x, y)| a * x + b * y).collect();
        let fxy = transform.fft(&combined).unwrap().to_vec();

        let expected: Vec<Complex<f64>> = fx.iter().zip(&fy).map(|(x, y)| *x * a + *y * b).collect();
        assert_spectra_close(&fxy, &expected, 1e-9);
    }

    #[test]
    fn output_is_overwritten_between_calls() {
        let mut transform = SpectralTransform::new(8).unwrap();
        transform.fft(&[1.0; 8]).unwrap();

        let spectrum = transform.fft(&[0.0; 8]).unwrap();

        assert!(spectrum.iter().all(|c| c.norm() == 0.0));
    }

    #[test]
    fn transform_applies_window_and_gain() {
        let n = 16;
        let mut transform = SpectralTransform::new(n).unwrap();
        let frame = vec![1.0f32; n];

        let (spectrum, replaced) = transform.transform(&frame, 3.0).unwrap();

        // DC bin is the sum of the scaled window
        let expected_dc: f64 = (0..n).map(|i| 3.0 * hann_window(i, n)).sum();
        assert_eq!(replaced, 0);
        assert!((spectrum[0].re - expected_dc).abs() < 1e-9);
        assert!(spectrum[0].im.abs() < 1e-9);
    }

    #[test]
    fn transform_zeroes_non_finite_samples() {
        let n = 8;
        let mut transform = SpectralTransform::new(n).unwrap();
        let mut frame = vec![0.0f32; n];
        frame[2] = f32::NAN;
        frame[5] = f32::INFINITY;

        let (spectrum, replaced) = transform.transform(&frame, 1.0).unwrap();

        assert_eq!(replaced, 2);
        assert!(spectrum.iter().all(|c| c.re == 0.0 && c.im == 0.0));
    }

    #[test]
    fn transform_rejects_wrong_frame_length() {
        let mut transform = SpectralTransform::new(8).unwrap();

        assert_eq!(
            transform.transform(&[0.0; 4], 1.0).err(),
            Some(PipelineError::FrameLengthMismatch {
                expected: 8,
                actual: 4
            })
        );
    }
}
