//! Additive mixing of several tones with their own dominance and bandwidth.

use rand::Rng;
use tracing::{debug, warn};

use super::{
    signal::Signal,
    tone::{sample_count, synthesize_with, ToneSpec},
};

/// One entry of a mix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixTone {
    pub frequency: f64,
    pub bandwidth: f64,
    /// Dominance of this tone, 0 to 100 percent.
    pub gain_percent: f64,
}

/// An ordered list of tones that share a duration and sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct MixSpec {
    pub tones: Vec<MixTone>,
    pub duration_ms: f64,
    pub sample_rate: u32,
}

impl MixTone {
    /// A pure tone at full dominance.
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            bandwidth: 0.0,
            gain_percent: 100.0,
        }
    }

    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn gain(mut self, gain_percent: f64) -> Self {
        self.gain_percent = gain_percent;
        self
    }
}

impl MixSpec {
    pub fn new(duration_ms: f64, sample_rate: u32) -> Self {
        Self {
            tones: Vec::new(),
            duration_ms,
            sample_rate,
        }
    }

    /// Adds a tone to the end of the mix.
    pub fn chain(mut self, tone: MixTone) -> Self {
        self.tones.push(tone);
        self
    }

    pub fn with_tones(mut self, tones: impl IntoIterator<Item = MixTone>) -> Self {
        self.tones.extend(tones);
        self
    }

    /// Length every tone in the mix (and the mix itself) will have.
    pub fn sample_count(&self) -> usize {
        sample_count(self.duration_ms, self.sample_rate)
    }

    /// Expands the mix into a [`ToneSpec`] and gain percentage per tone.
    pub fn tone_specs(&self) -> impl Iterator<Item = (ToneSpec, f64)> + '_ {
        self.tones.iter().map(|tone| {
            let spec = ToneSpec::new(tone.frequency, self.duration_ms, self.sample_rate)
                .bandwidth(tone.bandwidth);
            (spec, tone.gain_percent)
        })
    }
}

/// Mixes the tones, drawing any noise from the thread local RNG.
pub fn mix(spec: &MixSpec) -> Signal {
    mix_with(spec, &mut rand::thread_rng())
}

/// Mixes the tones using `rng` as the noise source.
///
/// Every tone is synthesized, normalized on its own, then scaled by its dominance.
/// The sum is normalized once more, so the loudest point of the mix is always 1.0
/// unless every tone is silent.
pub fn mix_with<R: Rng + ?Sized>(spec: &MixSpec, rng: &mut R) -> Signal {
    let len = spec.sample_count();
    let mut mixed = vec![0.0; len];

    if spec.tones.is_empty() {
        warn!("Mixing an empty tone list, output will be silent");
    }

    for (tone, gain_percent) in spec.tone_specs() {
        let signal = synthesize_with(&tone, rng)
            .normalized()
            .scaled(gain_percent / 100.0);

        for (out, sample) in mixed.iter_mut().zip(signal.samples()) {
            *out += sample;
        }
    }

    debug!(
        tones = spec.tones.len(),
        samples = len,
        "Mixed tones"
    );
    Signal::new(mixed, spec.sample_rate).normalized()
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::audio::tone::synthesize;

    #[test]
    fn test_mix_example() {
        let spec = MixSpec::new(25.0, 44100)
            .chain(MixTone::new(1000.0))
            .chain(MixTone::new(2000.0).gain(50.0));
        let signal = mix(&spec);

        assert_eq!(signal.len(), 1102);
        assert_eq!(signal.peak(), 1.0);
    }

    #[test]
    fn test_single_tone_matches_synthesis() {
        let tone = ToneSpec::new(1000.0, 25.0, 44100);
        let direct = synthesize(&tone);
        let mixed = mix(&MixSpec::new(25.0, 44100).chain(MixTone::new(1000.0)));

        assert_eq!(direct.len(), mixed.len());
        for (a, b) in direct.samples().iter().zip(mixed.samples()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_noise_tone_matches_synthesis() {
        let tone = ToneSpec::new(3000.0, 25.0, 44100).bandwidth(250.0);
        let direct = synthesize_with(&tone, &mut StdRng::seed_from_u64(9));
        let spec = MixSpec::new(25.0, 44100).chain(MixTone::new(3000.0).bandwidth(250.0));
        let mixed = mix_with(&spec, &mut StdRng::seed_from_u64(9));

        for (a, b) in direct.samples().iter().zip(mixed.samples()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_equal_gain_pairs_stay_in_range() {
        let freqs = [100.0, 250.0, 1000.0, 4321.0, 9999.0, 15000.0, 20000.0];
        for &a in freqs.iter() {
            for &b in freqs.iter() {
                let spec = MixSpec::new(10.0, 44100)
                    .chain(MixTone::new(a).gain(60.0))
                    .chain(MixTone::new(b).gain(60.0));
                let signal = mix(&spec);
                assert!(signal.peak() <= 1.0, "{a}Hz + {b}Hz");
                assert_eq!(signal.len(), 441);
            }
        }
    }

    #[test]
    fn test_zero_gain_is_silent() {
        let spec = MixSpec::new(25.0, 44100)
            .chain(MixTone::new(1000.0).gain(0.0))
            .chain(MixTone::new(500.0).gain(0.0));
        let signal = mix(&spec);

        assert_eq!(signal.len(), 1102);
        assert!(signal.samples().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_empty_mix_is_silent() {
        let signal = mix(&MixSpec::new(25.0, 44100));
        assert_eq!(signal.len(), 1102);
        assert_eq!(signal.peak(), 0.0);
    }

    #[test]
    fn test_dominance_changes_balance() {
        // With the 2kHz tone turned down, the 1kHz tone should dominate the mix
        let spec = MixSpec::new(100.0, 44100)
            .chain(MixTone::new(1000.0))
            .chain(MixTone::new(2000.0).gain(10.0));
        let signal = mix(&spec);

        let low = crate::audio::algorithms::goertzel_mag(1000.0, signal.samples(), 44100);
        let high = crate::audio::algorithms::goertzel_mag(2000.0, signal.samples(), 44100);
        assert!(low > high * 5.0);
    }

    #[test]
    fn test_tone_specs_share_timing() {
        let spec = MixSpec::new(40.0, 48000).with_tones([
            MixTone::new(440.0).bandwidth(20.0).gain(30.0),
            MixTone::new(880.0),
        ]);
        let specs = spec.tone_specs().collect::<Vec<_>>();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].0, ToneSpec::new(440.0, 40.0, 48000).bandwidth(20.0));
        assert_eq!(specs[0].1, 30.0);
        assert_eq!(specs[1].0.sample_count(), 1920);
    }
}
