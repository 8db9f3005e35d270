//! Finished audio buffers.

use serde::Serialize;

use super::algorithms;

/// Full scale of a signed 16 bit PCM sample.
const PCM_SCALE: f64 = i16::MAX as f64;

/// A finite mono buffer of samples, tagged with the rate it was produced at.
/// After normalization every sample lies in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f64>,
    sample_rate: u32,
}

/// Summary of a signal, printed by the `render` command.
#[derive(Debug, Clone, Serialize)]
pub struct SignalStats {
    pub samples: usize,
    pub sample_rate: u32,
    pub duration_ms: f64,
    pub peak: f64,
    pub rms: f64,
    pub first: Option<f64>,
    pub last: Option<f64>,
}

impl Signal {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// An all zero signal of `len` samples.
    pub fn silent(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; len], sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f64 {
        algorithms::peak(&self.samples)
    }

    /// Scales the signal so its peak is 1.0, see [`algorithms::normalize`].
    pub fn normalized(mut self) -> Self {
        algorithms::normalize(&mut self.samples);
        self
    }

    /// Multiplies every sample by `gain`.
    pub fn scaled(mut self, gain: f64) -> Self {
        self.samples.iter_mut().for_each(|x| *x *= gain);
        self
    }

    pub fn stats(&self) -> SignalStats {
        let rms = match self.samples.is_empty() {
            true => 0.0,
            false => {
                let sum = self.samples.iter().map(|x| x * x).sum::<f64>();
                (sum / self.samples.len() as f64).sqrt()
            }
        };

        SignalStats {
            samples: self.samples.len(),
            sample_rate: self.sample_rate,
            duration_ms: self.duration_ms(),
            peak: self.peak(),
            rms,
            first: self.samples.first().copied(),
            last: self.samples.last().copied(),
        }
    }
}

/// Converts a normalized sample to 16 bit PCM.
/// Anything outside of [-1, 1] is clipped.
pub fn to_pcm(sample: f64) -> i16 {
    (sample * PCM_SCALE)
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Converts a run of normalized samples to 16 bit PCM.
pub fn to_pcm_chunk(samples: &[f64]) -> Vec<i16> {
    samples.iter().map(|&x| to_pcm(x)).collect()
}
