use std::f64::consts::PI;

use rand::Rng;
use rand_distr::StandardNormal;
use rustfft::{num_complex::Complex, FftPlanner};
use tracing::trace;

use super::{
    algorithms::{apply_fades, fade_length, fft_frequencies, gaussian_band},
    signal::Signal,
};

/// Length of the fade-in and fade-out ramps.
pub const FADE_MS: f64 = 1.0;

/// Everything needed to synthesize one tone.
///
/// The bandwidth must keep the band inside the audible window,
/// `bandwidth <= min(frequency - 100, 20000 - frequency)`.
/// This is not checked here, clamp with [`crate::params::clamp_bandwidth`] first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    /// Target frequency in Hz.
    pub frequency: f64,
    /// Width of the noise band in Hz. Zero gives a pure sine.
    /// Only the magnitude matters, a negative width gives the same band as its positive.
    pub bandwidth: f64,
    pub duration_ms: f64,
    pub sample_rate: u32,
}

/// Sine generator over a fixed number of samples.
/// Sample `i` sits at time `i * step` seconds.
#[derive(Clone, Copy, Debug)]
pub struct SineTone {
    i: usize,
    len: usize,
    frequency: f64,
    step: f64,
}

impl ToneSpec {
    /// A pure tone.
    pub fn new(frequency: f64, duration_ms: f64, sample_rate: u32) -> Self {
        Self {
            frequency,
            bandwidth: 0.0,
            duration_ms,
            sample_rate,
        }
    }

    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn is_pure(&self) -> bool {
        self.bandwidth == 0.0
    }

    pub fn sample_count(&self) -> usize {
        sample_count(self.duration_ms, self.sample_rate)
    }
}

impl SineTone {
    pub fn new(frequency: f64, step: f64, len: usize) -> Self {
        Self {
            i: 0,
            len,
            frequency,
            step,
        }
    }
}

impl Iterator for SineTone {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.len {
            return None;
        }

        let t = self.i as f64 * self.step;
        self.i += 1;
        Some((2.0 * PI * self.frequency * t).sin())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.len - self.i;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SineTone {}

/// Number of samples in `duration_ms` milliseconds of audio.
/// Halves round to even, so 25ms at 44.1kHz is 1102 samples.
pub fn sample_count(duration_ms: f64, sample_rate: u32) -> usize {
    (sample_rate as f64 * duration_ms / 1000.0)
        .round_ties_even()
        .max(0.0) as usize
}

/// Synthesizes a tone, drawing any noise from the thread local RNG.
pub fn synthesize(spec: &ToneSpec) -> Signal {
    synthesize_with(spec, &mut rand::thread_rng())
}

/// Synthesizes a tone using `rng` as the noise source.
///
/// A pure tone is a plain sine. Otherwise white noise is shaped in the frequency domain
/// so its energy gathers around the target frequency, giving a hiss-like tone.
/// Both edges get a short exponential fade and the result is normalized.
pub fn synthesize_with<R: Rng + ?Sized>(spec: &ToneSpec, rng: &mut R) -> Signal {
    let len = spec.sample_count();
    if len == 0 {
        return Signal::silent(0, spec.sample_rate);
    }

    let mut samples = match spec.is_pure() {
        true => {
            let step = spec.duration_ms / 1000.0 / len as f64;
            SineTone::new(spec.frequency, step, len).collect::<Vec<_>>()
        }
        false => band_limited_noise(spec, len, rng),
    };

    apply_fades(&mut samples, fade_length(FADE_MS, spec.sample_rate));
    trace!(
        frequency = spec.frequency,
        bandwidth = spec.bandwidth,
        samples = len,
        "Synthesized tone"
    );

    Signal::new(samples, spec.sample_rate).normalized()
}

/// Gaussian white noise pushed through a pair of gaussian band-pass windows
/// at plus and minus the target frequency.
fn band_limited_noise<R: Rng + ?Sized>(spec: &ToneSpec, len: usize, rng: &mut R) -> Vec<f64> {
    let mut buf = (0..len)
        .map(|_| Complex::new(rng.sample::<f64, _>(StandardNormal), 0.0))
        .collect::<Vec<_>>();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(len).process(&mut buf);

    for (bin, freq) in buf.iter_mut().zip(fft_frequencies(len, spec.sample_rate)) {
        *bin *= gaussian_band(freq, spec.frequency, spec.bandwidth);
    }

    // rustfft does not scale the inverse transform
    planner.plan_fft_inverse(len).process(&mut buf);
    let scale = (len as f64).recip();
    buf.into_iter().map(|x| x.re * scale).collect()
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::audio::algorithms::goertzel_mag;

    #[test]
    fn test_short_sample_example() {
        let signal = synthesize(&ToneSpec::new(1000.0, 25.0, 44100));
        assert_eq!(signal.len(), 1102);
        assert_eq!(signal.peak(), 1.0);
        assert!(signal.samples()[0].abs() < 1e-9);
        assert!(signal.samples()[1101].abs() < 1e-9);
    }

    #[test]
    fn test_pure_tone_length_and_peak() {
        for freq in [100.0, 440.0, 1000.0, 7331.5, 20000.0] {
            for duration in [5.0, 25.0, 100.0] {
                let spec = ToneSpec::new(freq, duration, 44100);
                let signal = synthesize(&spec);
                assert_eq!(signal.len(), sample_count(duration, 44100));
                assert_eq!(signal.peak(), 1.0, "{freq}Hz {duration}ms");
            }
        }
    }

    #[test]
    fn test_sample_count_rounding() {
        assert_eq!(sample_count(25.0, 44100), 1102);
        assert_eq!(sample_count(1000.0, 44100), 44100);
        assert_eq!(sample_count(60000.0, 44100), 2_646_000);
        assert_eq!(sample_count(0.0, 44100), 0);
        assert_eq!(sample_count(1.0, 48000), 48);
    }

    #[test]
    fn test_zero_duration_is_empty() {
        let signal = synthesize(&ToneSpec::new(1000.0, 0.0, 44100).bandwidth(100.0));
        assert!(signal.is_empty());
    }

    #[test]
    fn test_fades_at_both_edges() {
        let mut rng = StdRng::seed_from_u64(7);
        for spec in [
            ToneSpec::new(440.0, 50.0, 44100),
            ToneSpec::new(3000.0, 50.0, 44100).bandwidth(400.0),
        ] {
            let signal = synthesize_with(&spec, &mut rng);
            let samples = signal.samples();
            let peak = signal.peak();
            assert!(samples[0].abs() < peak);
            assert!(samples[samples.len() - 1].abs() < peak);
        }
    }

    #[test]
    fn test_shorter_than_fade() {
        // 0.5ms is 22 samples, half of the 44 sample fade
        let signal = synthesize(&ToneSpec::new(5000.0, 0.5, 44100));
        assert_eq!(signal.len(), 22);
        assert_eq!(signal.samples()[0], 0.0);
        assert_eq!(signal.samples()[21], 0.0);
        assert!(signal.peak() <= 1.0);
    }

    #[test]
    fn test_noise_seeded() {
        let spec = ToneSpec::new(2000.0, 25.0, 44100).bandwidth(300.0);
        let a = synthesize_with(&spec, &mut StdRng::seed_from_u64(1));
        let b = synthesize_with(&spec, &mut StdRng::seed_from_u64(1));
        let c = synthesize_with(&spec, &mut StdRng::seed_from_u64(2));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 1102);
        assert!((a.peak() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_width_is_noise() {
        let spec = ToneSpec::new(2000.0, 25.0, 44100).bandwidth(300.0);
        let negative = spec.bandwidth(-300.0);
        assert!(!negative.is_pure());

        let a = synthesize_with(&spec, &mut StdRng::seed_from_u64(3));
        let b = synthesize_with(&negative, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_energy_near_target() {
        let spec = ToneSpec::new(4000.0, 250.0, 44100).bandwidth(200.0);
        let signal = synthesize_with(&spec, &mut StdRng::seed_from_u64(42));

        let band = |center: f64| {
            (-5..=5)
                .map(|i| goertzel_mag(center + i as f64 * 20.0, signal.samples(), 44100))
                .sum::<f64>()
        };
        let on = band(4000.0);
        let off = band(12000.0);
        assert!(on > off * 10.0, "on: {on}, off: {off}");
    }

    #[test]
    fn test_sine_tone_iter() {
        let tone = SineTone::new(1.0, 0.25, 4);
        assert_eq!(tone.len(), 4);

        let samples = tone.collect::<Vec<_>>();
        assert!(samples[0].abs() < 1e-12);
        assert!((samples[1] - 1.0).abs() < 1e-12);
        assert!(samples[2].abs() < 1e-12);
        assert!((samples[3] + 1.0).abs() < 1e-12);
    }
}
