//! Input validation and clamping for the values a user can enter.
//! Everything here runs before synthesis, the synthesizer itself trusts its inputs.

use thiserror::Error;

use crate::audio::MixTone;

/// Sample rate every tone is synthesized at.
pub const SAMPLE_RATE: u32 = 44100;
/// Lowest frequency that can be played.
pub const MIN_FREQUENCY: f64 = 100.0;
/// Highest frequency that can be played.
pub const MAX_FREQUENCY: f64 = 20_000.0;
pub const DEFAULT_FREQUENCY: f64 = 1000.0;
/// Length of a short sample.
pub const SHORT_SAMPLE_MS: f64 = 25.0;
/// Length of a constant tone, one minute.
pub const CONSTANT_TONE_MS: f64 = 60_000.0;
/// Dominance a tone gets when none is given.
pub const DEFAULT_GAIN: f64 = 100.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),
    #[error("Frequency must be between 100 Hz and 20000 Hz, got {0} Hz")]
    FrequencyOutOfRange(f64),
    #[error("Frequency cannot exceed 20000 Hz")]
    OctaveTooHigh,
    #[error("Frequency cannot be lower than 100 Hz")]
    OctaveTooLow,
    #[error("Duration must be between 0 ms and 60000 ms, got {0} ms")]
    DurationOutOfRange(f64),
    #[error("No frequencies given")]
    NoFrequencies,
    #[error("Expected {expected} {what} values (one per frequency), got {found}")]
    CountMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Widest band that still fits between the range limits around `frequency`.
pub fn max_bandwidth(frequency: f64) -> f64 {
    (frequency - MIN_FREQUENCY)
        .min(MAX_FREQUENCY - frequency)
        .max(0.0)
}

/// Clamps a bandwidth so the band stays inside the playable range.
/// Negative widths become zero (a pure tone).
pub fn clamp_bandwidth(frequency: f64, bandwidth: f64) -> f64 {
    bandwidth.clamp(0.0, max_bandwidth(frequency))
}

/// Clamps a dominance to 0 - 100 percent.
pub fn clamp_gain(gain_percent: f64) -> f64 {
    gain_percent.clamp(0.0, 100.0)
}

/// One octave up, if that is still in range.
pub fn octave_up(frequency: f64) -> Result<f64, ParamError> {
    let new = frequency * 2.0;
    match new > MAX_FREQUENCY {
        true => Err(ParamError::OctaveTooHigh),
        false => Ok(new),
    }
}

/// One octave down, if that is still in range.
pub fn octave_down(frequency: f64) -> Result<f64, ParamError> {
    let new = frequency / 2.0;
    match new < MIN_FREQUENCY {
        true => Err(ParamError::OctaveTooLow),
        false => Ok(new),
    }
}

/// Parses a finite number, ignoring surrounding whitespace.
pub fn parse_number(input: &str) -> Result<f64, ParamError> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| ParamError::InvalidNumber(trimmed.to_owned()))
}

/// Parses a typed in frequency. Out of range values are rejected, not clamped.
pub fn parse_frequency(input: &str) -> Result<f64, ParamError> {
    let frequency = parse_number(input)?;
    match (MIN_FREQUENCY..=MAX_FREQUENCY).contains(&frequency) {
        true => Ok(frequency),
        false => Err(ParamError::FrequencyOutOfRange(frequency)),
    }
}

/// Parses a duration in milliseconds, at most one constant tone long.
pub fn parse_duration(input: &str) -> Result<f64, ParamError> {
    let duration = parse_number(input)?;
    match (0.0..=CONSTANT_TONE_MS).contains(&duration) {
        true => Ok(duration),
        false => Err(ParamError::DurationOutOfRange(duration)),
    }
}

/// Parses a comma separated list of numbers, skipping empty entries.
pub fn parse_list(input: &str) -> Result<Vec<f64>, ParamError> {
    input
        .split(',')
        .filter(|x| !x.trim().is_empty())
        .map(parse_number)
        .collect()
}

/// Parses a comma separated list of frequencies like `1000, 2500,4000`.
pub fn parse_frequencies(input: &str) -> Result<Vec<f64>, ParamError> {
    let freqs = input
        .split(',')
        .filter(|x| !x.trim().is_empty())
        .map(parse_frequency)
        .collect::<Result<Vec<_>, _>>()?;

    match freqs.is_empty() {
        true => Err(ParamError::NoFrequencies),
        false => Ok(freqs),
    }
}

/// Builds the tones of a mix from confirmed frequencies and optional per-tone
/// dominances and widths. Missing lists default to full dominance and pure tones.
/// Dominances and widths are clamped per tone.
pub fn mix_tones(
    frequencies: &[f64],
    gains: Option<&[f64]>,
    widths: Option<&[f64]>,
) -> Result<Vec<MixTone>, ParamError> {
    if frequencies.is_empty() {
        return Err(ParamError::NoFrequencies);
    }

    let check = |what, list: Option<&[f64]>| match list {
        Some(i) if i.len() != frequencies.len() => Err(ParamError::CountMismatch {
            what,
            expected: frequencies.len(),
            found: i.len(),
        }),
        _ => Ok(()),
    };
    check("dominance", gains)?;
    check("width", widths)?;

    Ok(frequencies
        .iter()
        .enumerate()
        .map(|(i, &frequency)| {
            let gain = gains.map(|x| x[i]).unwrap_or(DEFAULT_GAIN);
            let width = widths.map(|x| x[i]).unwrap_or(0.0);
            MixTone::new(frequency)
                .gain(clamp_gain(gain))
                .bandwidth(clamp_bandwidth(frequency, width))
        })
        .collect())
}
