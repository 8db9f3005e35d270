//! Output device lookup.
//! Used when playback starts to pick the output device and a stream config for it.

use anyhow::{anyhow, Context, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait},
    Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange,
};
use tracing::{debug, info};

use crate::misc::Similarity;

/// Sample formats the playback driver knows how to fill, in order of preference.
const FORMATS: &[SampleFormat] = &[SampleFormat::I16, SampleFormat::F32, SampleFormat::U16];

/// An output device and the config it will be opened with.
pub struct OutputTarget {
    pub device: Device,
    pub config: SupportedStreamConfig,
}

impl OutputTarget {
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn channels(&self) -> usize {
        self.config.channels() as usize
    }

    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "<unknown>".to_owned())
    }
}

/// Names of all output devices on the default host.
pub fn output_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .context("Failed to enumerate output devices")?;

    Ok(devices
        .map(|x| x.name().unwrap_or_else(|_| "<unknown>".to_owned()))
        .collect())
}

/// Finds an output device by name.
/// `default` picks the host's default device, anything else picks the device whose
/// name is most similar (dice coefficient) to the wanted one.
pub fn find_output_device(wanted: &str) -> Result<Device> {
    let host = cpal::default_host();
    let wanted = wanted.to_lowercase();

    if wanted == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device"));
    }

    let comp_name = |dev: &Device| {
        dev.name()
            .map(|x| x.to_lowercase().similarity(&wanted))
            .unwrap_or(0.0)
    };

    host.output_devices()
        .context("Failed to enumerate output devices")?
        .map(|x| (comp_name(&x), x))
        .reduce(|a, b| if a.0 >= b.0 { a } else { b })
        .map(|x| x.1)
        .ok_or_else(|| anyhow!("No output device found"))
}

/// Picks the device and a config for playing audio at `sample_rate`.
/// Falls back to the device's default config if it cannot run at that rate,
/// in which case the caller has to resample.
pub fn select_output(wanted: &str, sample_rate: u32) -> Result<OutputTarget> {
    let device = find_output_device(wanted)?;
    let configs = device
        .supported_output_configs()
        .context("Failed to query output configs")?
        .collect::<Vec<_>>();

    let config = match find_supported_config(configs, sample_rate) {
        Some(i) => i.with_sample_rate(cpal::SampleRate(sample_rate)),
        None => {
            debug!("No output config runs at {sample_rate}Hz, using the device default");
            device
                .default_output_config()
                .context("No default output config")?
        }
    };

    let target = OutputTarget { device, config };
    info!(
        "Output hooked into `{}` ({}Hz, {} channels, {:?})",
        target.name(),
        target.sample_rate(),
        target.channels(),
        target.config.sample_format()
    );
    Ok(target)
}

/// Finds a config range containing `sample_rate` with a usable sample format.
/// Fewer channels are preferred since the signal is mono.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    sample_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| {
            c.min_sample_rate().0 <= sample_rate && c.max_sample_rate().0 >= sample_rate
        })
        .filter_map(|c| {
            let format = FORMATS.iter().position(|&f| f == c.sample_format())?;
            Some((format, c))
        })
        .min_by_key(|(format, c)| (c.channels(), *format))
        .map(|x| x.1)
}
