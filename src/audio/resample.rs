//! Sample rate conversion for output devices that can't run at the signal's rate.

use anyhow::{Context, Result};
use rubato::{InterpolationParameters, InterpolationType, Resampler, SincFixedIn, WindowFunction};
use tracing::debug;

use super::signal::Signal;

/// Frames handed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// Converts a signal to `sample_rate`.
/// The output has `round(len * ratio)` samples, so durations are kept.
pub fn resample(signal: &Signal, sample_rate: u32) -> Result<Signal> {
    if signal.sample_rate() == sample_rate || signal.is_empty() {
        return Ok(Signal::new(signal.samples().to_vec(), sample_rate));
    }

    let ratio = sample_rate as f64 / signal.sample_rate() as f64;
    let parameters = InterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: InterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, parameters, RESAMPLE_CHUNK, 1)
        .context("Failed to create resampler")?;

    // One extra chunk of silence flushes the resampler's delay line
    let expected = (signal.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(expected + RESAMPLE_CHUNK * 2);
    let padded = signal
        .samples()
        .chunks(RESAMPLE_CHUNK)
        .map(|x| x.to_vec())
        .chain(std::iter::once(Vec::new()));

    for mut chunk in padded {
        chunk.resize(RESAMPLE_CHUNK, 0.0);
        let processed = resampler
            .process(&[chunk], None)
            .context("Failed to resample signal")?;
        out.extend_from_slice(&processed[0]);
    }

    out.resize(expected, 0.0);
    debug!(
        "Resampled {} samples at {}Hz to {} samples at {}Hz",
        signal.len(),
        signal.sample_rate(),
        out.len(),
        sample_rate
    );

    Ok(Signal::new(out, sample_rate))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio::tone::{synthesize, ToneSpec};

    #[test]
    fn test_same_rate_is_copy() {
        let signal = synthesize(&ToneSpec::new(1000.0, 25.0, 44100));
        let out = resample(&signal, 44100).unwrap();
        assert_eq!(out, signal);
    }

    #[test]
    fn test_resample_keeps_duration() {
        let signal = synthesize(&ToneSpec::new(1000.0, 100.0, 44100));
        let out = resample(&signal, 48000).unwrap();

        assert_eq!(out.sample_rate(), 48000);
        assert_eq!(out.len(), 4800);
        assert!(out.peak() > 0.5);
    }

    #[test]
    fn test_resample_empty() {
        let out = resample(&Signal::silent(0, 44100), 48000).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.sample_rate(), 48000);
    }
}
