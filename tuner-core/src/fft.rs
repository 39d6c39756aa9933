//! # Fast Fourier Transform (FFT) Module
//!
//! Turns a completed sample buffer into the dominant frequency of the signal.
//!
//! ## Pipeline
//! 1. Forward FFT of the real buffer (planned once, at startup)
//! 2. Magnitudes of the non-redundant half of the spectrum
//! 3. DC bin forced to zero, then a low-to-high scan for the maximum
//! 4. Bin index converted to Hz
//!
//! Resolution is one bin, `sample_rate / N` Hz. No interpolation is done.

use log::info;
use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

use crate::error::TunerError;
use crate::sampler::SampleBuffer;

/// Smallest buffer the analyzer accepts.
pub const MIN_FFT_LEN: usize = 4;

/// The dominant non-DC component of one buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub bin: usize,
    pub magnitude: f32,
    pub frequency: f32,
}

/// A forward FFT planned for a fixed buffer length, with its working storage.
pub struct SpectralAnalyzer {
    len: usize,
    sample_rate: f32,
    fft: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("len", &self.len)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl SpectralAnalyzer {
    /// Plans the transform for `len` samples taken at `sample_rate` Hz.
    ///
    /// # Errors
    /// [`TunerError::UnsupportedLength`] unless `len` is a power of two of at
    /// least [`MIN_FFT_LEN`]. Since the length is fixed at build time this is a
    /// configuration error, not a runtime condition.
    pub fn new(len: usize, sample_rate: f32) -> Result<Self, TunerError> {
        if len < MIN_FFT_LEN || !len.is_power_of_two() {
            return Err(TunerError::UnsupportedLength { len, min: MIN_FFT_LEN });
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];

        info!("FFT initialized for {len} samples at {sample_rate} Hz");
        Ok(Self {
            len,
            sample_rate,
            fft,
            spectrum: vec![Complex::default(); len],
            scratch,
            magnitudes: vec![0.0; len / 2],
        })
    }

    /// Performs the forward FFT of a real buffer.
    ///
    /// # Arguments
    /// * `buffer` - A full sample buffer of exactly `len` readings
    ///
    /// # Returns
    /// * `Ok(spectrum)` - `len` complex frequency bins
    /// * `Err(TunerError::BufferLength)` - The buffer does not match the plan
    pub fn transform(&mut self, buffer: &SampleBuffer) -> Result<&[Complex<f32>], TunerError> {
        if buffer.len() != self.len {
            return Err(TunerError::BufferLength {
                expected: self.len,
                actual: buffer.len(),
            });
        }

        for (bin, &sample) in self.spectrum.iter_mut().zip(buffer.as_slice()) {
            *bin = Complex { re: sample, im: 0.0 };
        }
        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);
        Ok(&self.spectrum)
    }

    /// Calculates the magnitudes of the last transform.
    ///
    /// Only the first half of the spectrum (up to the Nyquist frequency)
    /// carries information for a real input, so `len / 2` values are kept.
    pub fn magnitude(&mut self) -> &mut [f32] {
        for (mag, c) in self.magnitudes.iter_mut().zip(&self.spectrum) {
            *mag = c.norm(); // .norm() is sqrt(re^2 + im^2)
        }
        &mut self.magnitudes
    }

    /// Runs transform, magnitude and peak extraction on one buffer.
    pub fn analyze(&mut self, buffer: &SampleBuffer) -> Result<SpectralPeak, TunerError> {
        let (sample_rate, len) = (self.sample_rate, self.len);
        self.transform(buffer)?;
        Ok(extract_peak(self.magnitude(), sample_rate, len))
    }
}

/// Finds the dominant non-DC component of a magnitude spectrum.
///
/// # Arguments
/// * `magnitudes` - Half spectrum from [`SpectralAnalyzer::magnitude`]; its DC bin is zeroed
/// * `sample_rate` - Sample rate in Hz
/// * `len` - Length of the FFT the spectrum came from
///
/// # Returns
/// * The peak bin, its magnitude and its frequency in Hz
pub fn extract_peak(magnitudes: &mut [f32], sample_rate: f32, len: usize) -> SpectralPeak {
    let (bin, magnitude) = find_peak(magnitudes);
    SpectralPeak {
        bin,
        magnitude,
        frequency: bin_to_frequency(bin, sample_rate, len),
    }
}

/// Zeroes the DC bin and returns the index and value of the largest
/// remaining magnitude.
///
/// The scan runs from low to high bins and keeps the first maximum on ties.
/// Bin 0 is only returned when there is no other bin.
pub fn find_peak(magnitudes: &mut [f32]) -> (usize, f32) {
    let Some(dc) = magnitudes.first_mut() else {
        return (0, 0.0);
    };
    // The DC offset of the analog input dominates otherwise.
    *dc = 0.0;

    let mut best = (0, 0.0);
    for (i, &mag) in magnitudes.iter().enumerate().skip(1) {
        if i == 1 || mag > best.1 {
            best = (i, mag);
        }
    }
    best
}

/// Frequency in Hz at the centre of `bin` for an FFT of `len` samples.
pub fn bin_to_frequency(bin: usize, sample_rate: f32, len: usize) -> f32 {
    bin as f32 * (sample_rate / 2.0) / (len as f32 / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> SampleBuffer {
        SampleBuffer::from_samples(
            (0..len)
                .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
                .collect(),
        )
    }

    #[test]
    fn rejects_unsupported_lengths() {
        for len in [0, 2, 3, 1000, 2047] {
            assert!(matches!(
                SpectralAnalyzer::new(len, 2000.0),
                Err(TunerError::UnsupportedLength { .. })
            ));
        }
        assert!(SpectralAnalyzer::new(2048, 2000.0).is_ok());
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let mut analyzer = SpectralAnalyzer::new(8, 2000.0).unwrap();
        let result = analyzer.transform(&SampleBuffer::new(16));
        assert!(matches!(
            result,
            Err(TunerError::BufferLength { expected: 8, actual: 16 })
        ));
    }

    #[test]
    fn peak_skips_dc() {
        let mut mags = vec![100.0, 1.0, 3.0, 2.0];
        assert_eq!(find_peak(&mut mags), (2, 3.0));
        assert_eq!(mags[0], 0.0);
    }

    #[test]
    fn peak_is_never_dc_for_flat_spectrum() {
        let mut mags = vec![0.0; 8];
        assert_eq!(find_peak(&mut mags).0, 1);
    }

    #[test]
    fn first_maximum_wins_ties() {
        let mut mags = vec![0.0, 1.0, 5.0, 2.0, 5.0, 5.0];
        assert_eq!(find_peak(&mut mags), (2, 5.0));
    }

    #[test]
    fn no_bin_beats_the_peak() {
        let mut mags: Vec<f32> = (0..64).map(|i| ((i * 37) % 23) as f32).collect();
        let (peak, value) = find_peak(&mut mags);
        assert!(peak >= 1);
        assert!(mags[1..].iter().all(|&m| m <= value));
        assert!(mags[1..peak].iter().all(|&m| m < value));
    }

    #[test]
    fn frequency_is_linear_in_bin() {
        assert_eq!(bin_to_frequency(0, 2000.0, 2048), 0.0);
        assert_eq!(bin_to_frequency(1024, 2000.0, 2048), 1000.0);
        let last = bin_to_frequency(1023, 2000.0, 2048);
        assert!((last - (1000.0 - 2000.0 / 2048.0)).abs() < 1e-3);
        let step = bin_to_frequency(2, 2000.0, 2048) - bin_to_frequency(1, 2000.0, 2048);
        assert!((step - 0.976_562_5).abs() < 1e-6);
    }

    #[test]
    fn magnitudes_keep_half_the_spectrum() {
        // Constant input: all energy in DC, which is 4 * 8 for eight samples of 4.
        let mut analyzer = SpectralAnalyzer::new(8, 2000.0).unwrap();
        analyzer.transform(&SampleBuffer::from_samples(vec![4.0; 8])).unwrap();
        let mags = analyzer.magnitude();
        assert_eq!(mags.len(), 4);
        assert!((mags[0] - 32.0).abs() < 1e-4);
        assert!(mags[1..].iter().all(|&m| m < 1e-4));
    }

    #[test]
    fn finds_sine_within_one_bin() {
        let mut analyzer = SpectralAnalyzer::new(2048, 2000.0).unwrap();
        let peak = analyzer.analyze(&sine(110.0, 2000.0, 2048)).unwrap();
        assert!((peak.frequency - 110.0).abs() <= 2000.0 / 2048.0);
        assert_ne!(peak.bin, 0);
    }

    #[test]
    fn dc_offset_does_not_mask_the_tone() {
        let mut buffer = sine(329.63, 2000.0, 2048).as_slice().to_vec();
        for s in &mut buffer {
            *s = 2048.0 + 500.0 * *s;
        }
        let mut analyzer = SpectralAnalyzer::new(2048, 2000.0).unwrap();
        let peak = analyzer.analyze(&SampleBuffer::from_samples(buffer)).unwrap();
        assert!((peak.frequency - 329.63).abs() <= 2000.0 / 2048.0);
    }

    #[test]
    fn step_by_step_matches_analyze() {
        let buffer = sine(196.0, 2000.0, 2048);
        let mut analyzer = SpectralAnalyzer::new(2048, 2000.0).unwrap();
        let expected = analyzer.analyze(&buffer).unwrap();

        assert_eq!(analyzer.transform(&buffer).unwrap().len(), 2048);
        let mut mags = analyzer.magnitude().to_vec();
        assert_eq!(mags.len(), 1024);
        assert_eq!(extract_peak(&mut mags, 2000.0, 2048), expected);
        assert_eq!(mags[0], 0.0);
    }
}
