//! Short-time Fourier transform and its inverse
//!
//! Frames are centered: the signal is reflect-padded by `frame_size / 2` on
//! both sides, so frame `t` is centered on sample `t * hop_size`. Only the
//! non-negative frequency bins (`frame_size / 2 + 1`) are kept.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Complex spectrogram, `frames x bins`
pub type ComplexSpectrogram = Vec<Vec<Complex<f32>>>;

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos())
        .collect()
}

/// Number of centered frames for a signal of `len` samples
pub fn frame_count(len: usize, hop_size: usize) -> usize {
    if len == 0 || hop_size == 0 {
        0
    } else {
        1 + len / hop_size
    }
}

fn validate(frame_size: usize, hop_size: usize) -> Result<(), AnalysisError> {
    if frame_size < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "Frame size must be >= 2, got {}",
            frame_size
        )));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop size must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Reflect-pad by `pad` samples on both sides (zero padding when the signal is too short)
fn pad_centered(samples: &[f32], pad: usize) -> Vec<f32> {
    let n = samples.len();
    let mut padded = Vec::with_capacity(n + 2 * pad);

    if n > pad {
        padded.extend((1..=pad).rev().map(|i| samples[i]));
        padded.extend_from_slice(samples);
        padded.extend((0..pad).map(|i| samples[n - 2 - i]));
    } else {
        padded.resize(pad, 0.0);
        padded.extend_from_slice(samples);
        padded.resize(n + 2 * pad, 0.0);
    }

    padded
}

/// Compute the complex STFT with a Hann window
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `frame_size` - FFT size
/// * `hop_size` - Samples between frame centers
///
/// # Returns
///
/// `frame_count(samples.len(), hop_size)` frames of `frame_size / 2 + 1` bins
pub fn stft(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<ComplexSpectrogram, AnalysisError> {
    validate(frame_size, hop_size)?;

    let n_frames = frame_count(samples.len(), hop_size);
    if n_frames == 0 {
        return Ok(Vec::new());
    }

    log::debug!(
        "Computing STFT: {} samples, frame={}, hop={}, {} frames",
        samples.len(),
        frame_size,
        hop_size,
        n_frames
    );

    let padded = pad_centered(samples, frame_size / 2);
    let window = hann_window(frame_size);
    let n_bins = frame_size / 2 + 1;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];

    let mut frames = Vec::with_capacity(n_frames);
    for t in 0..n_frames {
        let start = t * hop_size;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = padded.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].to_vec());
    }

    Ok(frames)
}

/// Magnitude of a complex spectrogram
pub fn magnitude(spec: &ComplexSpectrogram) -> Vec<Vec<f32>> {
    spec.iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect()
}

/// Compute the magnitude STFT
pub fn magnitude_spectrogram(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<Vec<f32>>, AnalysisError> {
    Ok(magnitude(&stft(samples, frame_size, hop_size)?))
}

/// Inverse STFT by weighted overlap-add
///
/// # Arguments
///
/// * `spec` - Complex spectrogram from [`stft`] (`frame_size / 2 + 1` bins per frame)
/// * `frame_size` - FFT size used for analysis
/// * `hop_size` - Hop size used for analysis
/// * `length` - Output length in samples (the original signal length)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` when a frame has the wrong bin count
pub fn istft(
    spec: &ComplexSpectrogram,
    frame_size: usize,
    hop_size: usize,
    length: usize,
) -> Result<Vec<f32>, AnalysisError> {
    validate(frame_size, hop_size)?;

    if spec.is_empty() || length == 0 {
        return Ok(vec![0.0; length]);
    }

    let n_bins = frame_size / 2 + 1;
    if let Some((i, frame)) = spec.iter().enumerate().find(|(_, f)| f.len() != n_bins) {
        return Err(AnalysisError::InvalidInput(format!(
            "Frame {} has {} bins, expected {}",
            i,
            frame.len(),
            n_bins
        )));
    }

    let window = hann_window(frame_size);
    let pad = frame_size / 2;
    let out_len = frame_size + hop_size * (spec.len() - 1);
    let mut output = vec![0.0f32; out_len];
    let mut window_sum = vec![0.0f32; out_len];

    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
    let scale = 1.0 / frame_size as f32;

    for (t, frame) in spec.iter().enumerate() {
        buffer[..n_bins].copy_from_slice(frame);
        // Hermitian symmetry for the negative frequencies
        for k in n_bins..frame_size {
            buffer[k] = buffer[frame_size - k].conj();
        }
        ifft.process(&mut buffer);

        let start = t * hop_size;
        for i in 0..frame_size {
            output[start + i] += buffer[i].re * scale * window[i];
            window_sum[start + i] += window[i] * window[i];
        }
    }

    for (sample, &w) in output.iter_mut().zip(window_sum.iter()) {
        if w > EPSILON {
            *sample /= w;
        }
    }

    let mut signal: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
    signal.resize(length, 0.0);

    Ok(signal)
}
