//! Fixed-window MFCC feature computation.
//!
//! Pipeline: Hann-windowed STFT -> power spectrum -> mel filterbank ->
//! log energies -> DCT-II. The waveform is truncated or zero-padded to a
//! fixed duration first, so the output shape is deterministic for fixed
//! parameters: `(n_mfcc, 1 + window_samples / hop_length)`.

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::audio::Waveform;

/// MFCC computation parameters.
#[derive(Debug, Clone)]
pub struct MfccConfig {
    /// Number of cepstral coefficients to keep
    pub n_mfcc: usize,
    /// Number of mel filterbank bands
    pub n_mels: usize,
    /// FFT size
    pub n_fft: usize,
    /// Hop length in samples
    pub hop_length: usize,
    /// Expected waveform sample rate in Hz
    pub sample_rate: u32,
    /// Fixed analysis window in seconds
    pub window_secs: u32,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 40,
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            sample_rate: 16_000,
            window_secs: 5,
        }
    }
}

impl MfccConfig {
    /// Number of samples in the fixed analysis window.
    pub fn window_samples(&self) -> usize {
        self.window_secs as usize * self.sample_rate as usize
    }

    /// Number of STFT frames produced for the fixed window.
    pub fn num_frames(&self) -> usize {
        1 + self.window_samples() / self.hop_length
    }
}

/// Computes MFCC matrices over a fixed time window.
pub struct MfccExtractor {
    config: MfccConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Triangular mel filterbank, `n_mels` rows over `n_fft/2 + 1` bins
    mel_bank: Vec<Vec<f32>>,
    /// DCT-II basis, `n_mfcc` rows over `n_mels` columns
    dct_basis: Vec<Vec<f32>>,
}

impl MfccExtractor {
    pub fn new(config: MfccConfig) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(config.n_fft);
        let window = hann_window(config.n_fft);
        let mel_bank = mel_filterbank(config.n_mels, config.sample_rate, config.n_fft);
        let dct_basis = dct_ii_basis(config.n_mfcc, config.n_mels);

        Self {
            config,
            fft,
            window,
            mel_bank,
            dct_basis,
        }
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Compute the MFCC matrix for a waveform.
    ///
    /// The waveform is truncated to the fixed window or right-padded with
    /// silence if shorter. The result shape is `(n_mfcc, num_frames)` and
    /// is bit-identical for identical input and parameters.
    pub fn compute(&self, waveform: &Waveform) -> Array2<f32> {
        let cfg = &self.config;
        let target_len = cfg.window_samples();

        // Fix the window: truncate or pad with silence.
        let mut fixed = vec![0.0f32; target_len];
        let copy_len = waveform.samples.len().min(target_len);
        fixed[..copy_len].copy_from_slice(&waveform.samples[..copy_len]);

        // Center frames by padding half an FFT window on both sides.
        let pad = cfg.n_fft / 2;
        let mut padded = vec![0.0f32; target_len + cfg.n_fft];
        padded[pad..pad + target_len].copy_from_slice(&fixed);

        let num_frames = cfg.num_frames();
        let num_bins = cfg.n_fft / 2 + 1;

        let mut mfcc = Array2::<f32>::zeros((cfg.n_mfcc, num_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0f32); cfg.n_fft];
        let mut power = vec![0.0f32; num_bins];
        let mut log_mel = vec![0.0f32; cfg.n_mels];

        for frame_idx in 0..num_frames {
            let start = frame_idx * cfg.hop_length;

            // Windowed frame into the FFT buffer.
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.fft.process(&mut buffer);

            for (bin, p) in power.iter_mut().enumerate() {
                *p = buffer[bin].norm_sqr();
            }

            // Mel energies, then log.
            for (m, filter) in self.mel_bank.iter().enumerate() {
                let energy: f32 = filter
                    .iter()
                    .zip(power.iter())
                    .map(|(&w, &p)| w * p)
                    .sum();
                log_mel[m] = (energy + 1e-10).ln();
            }

            // DCT-II projection to cepstral coefficients.
            for (k, basis) in self.dct_basis.iter().enumerate() {
                let coeff: f32 = log_mel
                    .iter()
                    .zip(basis.iter())
                    .map(|(&e, &b)| e * b)
                    .sum();
                mfcc[[k, frame_idx]] = coeff;
            }
        }

        mfcc
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / size as f32).cos()
        })
        .collect()
}

/// Convert frequency in Hz to the HTK mel scale.
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert HTK mel back to Hz.
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over `n_fft/2 + 1` linear-frequency bins.
fn mel_filterbank(n_mels: usize, sample_rate: u32, n_fft: usize) -> Vec<Vec<f32>> {
    let num_bins = n_fft / 2 + 1;
    let f_max = sample_rate as f32 / 2.0;

    // n_mels + 2 edge points equally spaced on the mel scale.
    let mel_max = hz_to_mel(f_max);
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| {
            let mel = mel_max * i as f32 / (n_mels + 1) as f32;
            mel_to_hz(mel) * n_fft as f32 / sample_rate as f32
        })
        .collect();

    let mut bank = vec![vec![0.0f32; num_bins]; n_mels];
    for (m, filter) in bank.iter_mut().enumerate() {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        for (bin, weight) in filter.iter_mut().enumerate() {
            let f = bin as f32;
            if f > left && f < center {
                *weight = (f - left) / (center - left);
            } else if f >= center && f < right {
                *weight = (right - f) / (right - center);
            }
        }
    }
    bank
}

/// DCT-II basis vectors.
fn dct_ii_basis(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let mut basis = vec![vec![0.0f32; n_in]; n_out];
    for (k, row) in basis.iter_mut().enumerate() {
        for (n, b) in row.iter_mut().enumerate() {
            *b = (std::f32::consts::PI * k as f32 * (n as f32 + 0.5) / n_in as f32).cos();
        }
    }
    basis
}
