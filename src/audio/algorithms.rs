//! Audio processing algorithms.
//! Normalization, click-suppressing fades and the spectral helpers used by the band-limited noise tone.

use std::f64::consts::PI;

use num_complex::Complex;
use num_traits::Float;

/// Steepness of the exponential fade ramps.
const FADE_STEEPNESS: f64 = 5.0;

/// Returns the largest absolute sample value, or zero for an empty slice.
pub fn peak<T: Float>(samples: &[T]) -> T {
    samples.iter().fold(T::zero(), |a, &b| a.max(b.abs()))
}

/// Scales the samples so the loudest one has a magnitude of exactly 1.
/// A silent (all zero) buffer is left untouched.
pub fn normalize<T: Float>(samples: &mut [T]) {
    let max = peak(samples);
    if max > T::zero() {
        for sample in samples.iter_mut() {
            *sample = *sample / max;
        }
    }
}

/// Number of samples in a fade of `duration_ms` milliseconds.
/// Truncates, so 1ms at 44.1kHz is 44 samples.
pub fn fade_length(duration_ms: f64, sample_rate: u32) -> usize {
    (sample_rate as f64 * (duration_ms / 1000.0)) as usize
}

/// Fade-in envelope `1 - e^(-5s)` with `s` stepping linearly from 0 to 1 (both ends included).
pub fn fade_in_envelope(len: usize) -> Vec<f64> {
    ramp(len)
        .map(|s| 1.0 - (-FADE_STEEPNESS * s).exp())
        .collect()
}

/// Mirror image of [`fade_in_envelope`], ending at zero.
pub fn fade_out_envelope(len: usize) -> Vec<f64> {
    let mut out = fade_in_envelope(len);
    out.reverse();
    out
}

/// Applies a fade-in to the start and a fade-out to the end of the buffer.
/// When the buffer is shorter than the fade, the envelopes are cut down to the buffer:
/// the fade-in keeps its leading values and the fade-out keeps its trailing values.
pub fn apply_fades(samples: &mut [f64], fade_len: usize) {
    let fade_in = fade_in_envelope(fade_len);
    let fade_out = fade_out_envelope(fade_len);

    for (sample, gain) in samples.iter_mut().zip(fade_in.iter()) {
        *sample *= gain;
    }

    for (sample, gain) in samples.iter_mut().rev().zip(fade_out.iter().rev()) {
        *sample *= gain;
    }
}

/// Signed frequency of every FFT bin, in the usual layout:
/// DC and the positive frequencies first, then the negative ones.
pub fn fft_frequencies(len: usize, sample_rate: u32) -> Vec<f64> {
    let resolution = sample_rate as f64 / len as f64;
    let positive = (len + 1) / 2;

    (0..len)
        .map(|i| match i < positive {
            true => i as f64 * resolution,
            false => (i as f64 - len as f64) * resolution,
        })
        .collect()
}

/// Gain of a pair of gaussian windows centered on `+center` and `-center`.
/// Each window has a standard deviation of half the `width`.
pub fn gaussian_band(freq: f64, center: f64, width: f64) -> f64 {
    let sigma = width / 2.0;
    let lobe = |offset: f64| (-0.5 * (offset / sigma).powi(2)).exp();
    lobe(freq - center) + lobe(freq + center)
}

/// Implements the [Goertzel algorithm](https://en.wikipedia.org/wiki/Goertzel_algorithm) to find the magnitude of a frequency in a slice of samples.
pub fn goertzel_mag(freq: f64, samples: &[f64], sample_rate: u32) -> f64 {
    let k = (0.5 + (samples.len() as f64 * freq) / sample_rate as f64).floor();
    let omega = (2.0 * PI * k) / samples.len() as f64;
    let sin = omega.sin();
    let cos = omega.cos();
    let coeff = cos * 2.0;

    let mut s1 = 0.0;
    let mut s2 = 0.0;

    for i in samples {
        let s = coeff * s1 - s2 + i;
        s2 = s1;
        s1 = s;
    }

    let real = s1 - s2 * cos;
    let imag = s2 * sin;

    Complex::new(real, imag).norm()
}

/// `len` points evenly spaced over [0, 1], like a linspace with the endpoint included.
fn ramp(len: usize) -> impl Iterator<Item = f64> {
    let step = match len {
        0 | 1 => 0.0,
        _ => 1.0 / (len - 1) as f64,
    };
    (0..len).map(move |i| i as f64 * step)
}
