//! Tone synthesis for tinnitus frequency matching.
//!
//! Builds short or constant pure tones and band-limited noise tones, mixes several
//! of them with their own dominance and width, and streams the result to an output device.
//! Callers describe what they want with plain value structs ([`audio::ToneSpec`],
//! [`audio::MixSpec`]) and get a finished [`audio::Signal`] back.

pub mod audio;
pub mod misc;
pub mod params;
