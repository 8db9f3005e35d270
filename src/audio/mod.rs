//! Audio utilities.
//! Tone synthesis, mixing and playback.

pub mod algorithms;
pub mod devices;
pub mod mix;
pub mod playback;
pub mod resample;
pub mod signal;
pub mod tone;
pub mod worker;

pub use mix::{mix, mix_with, MixSpec, MixTone};
pub use playback::{CancelToken, PlaybackOutcome};
pub use signal::Signal;
pub use tone::{synthesize, synthesize_with, ToneSpec};
