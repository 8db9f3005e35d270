use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tinnitone::{
    audio::MixTone,
    params::{self, DEFAULT_FREQUENCY, SHORT_SAMPLE_MS},
};

/// Parsed and validated command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub output_device: String,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Play one tone, the width is already clamped.
    Tone {
        frequency: f64,
        width: f64,
        constant: bool,
    },
    /// Play several tones mixed together.
    Mix { tones: Vec<MixTone>, constant: bool },
    /// Synthesize without playing and print a summary.
    Render {
        tones: Vec<MixTone>,
        duration_ms: f64,
        seed: Option<u64>,
    },
    /// List the output devices.
    Devices,
}

pub fn command() -> Command {
    let constant = Arg::new("constant")
        .short('c')
        .long("constant")
        .action(ArgAction::SetTrue)
        .help("Play for a minute instead of a short sample, any key stops it early.");
    let tones = Arg::new("tones")
        .short('t')
        .long("tones")
        .required(true)
        .help("Comma separated frequencies in Hz, 100 to 20000.");
    let gains = Arg::new("gains")
        .short('g')
        .long("gains")
        .help("Comma separated dominance of each tone in percent. Defaults to 100 each.");
    let widths = Arg::new("widths")
        .short('w')
        .long("widths")
        .help("Comma separated width of each tone in Hz. Defaults to 0 (pure tones).");

    Command::new("tinnitone")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Find and play the tones of your tinnitus. VOLUME WARNING: start with your volume low.")
        .subcommand_required(true)
        .arg(
            Arg::new("output-device")
                .short('o')
                .long("output-device")
                .global(true)
                .default_value("default")
                .help("Output device to play on, matched by name."),
        )
        .subcommands([
            Command::new("tone")
                .alias("t")
                .about("Plays a single pure or noise tone.")
                .arg(
                    Arg::new("frequency")
                        .short('f')
                        .long("frequency")
                        .default_value("1000")
                        .help("Frequency in Hz, 100 to 20000."),
                )
                .arg(
                    Arg::new("width")
                        .short('w')
                        .long("width")
                        .default_value("0")
                        .help("Frequency width in Hz. Anything above 0 makes the tone more hiss-like."),
                )
                .arg(
                    Arg::new("octave-up")
                        .long("octave-up")
                        .action(ArgAction::Count)
                        .conflicts_with("octave-down")
                        .help("Raise the frequency by an octave, repeat for more."),
                )
                .arg(
                    Arg::new("octave-down")
                        .long("octave-down")
                        .action(ArgAction::Count)
                        .help("Lower the frequency by an octave, repeat for more."),
                )
                .arg(constant.clone()),
            Command::new("mix")
                .alias("m")
                .about("Plays several tones mixed together.")
                .arg(tones.clone())
                .arg(gains.clone())
                .arg(widths.clone())
                .arg(constant),
            Command::new("render")
                .alias("r")
                .about("Synthesizes tones without playing them and prints a JSON summary.")
                .arg(tones.required(false).default_value("1000"))
                .arg(gains)
                .arg(widths)
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .default_value("25")
                        .allow_hyphen_values(true)
                        .help("Duration in milliseconds, up to 60000."),
                )
                .arg(
                    Arg::new("seed")
                        .short('s')
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Seed for the noise, for repeatable output."),
                ),
            Command::new("devices")
                .alias("d")
                .about("Lists the available output devices."),
        ])
}

pub fn parse_args() -> Result<Args> {
    Args::from_matches(&command().get_matches())
}

impl Args {
    pub fn from_matches(m: &ArgMatches) -> Result<Self> {
        let output_device = m
            .get_one::<String>("output-device")
            .cloned()
            .unwrap_or_else(|| "default".to_owned());

        let action = match m.subcommand() {
            Some(("tone", m)) => tone_action(m)?,
            Some(("mix", m)) => Action::Mix {
                tones: mix_tones(m)?,
                constant: m.get_flag("constant"),
            },
            Some(("render", m)) => Action::Render {
                tones: mix_tones(m)?,
                duration_ms: match m.get_one::<String>("duration") {
                    Some(i) => params::parse_duration(i)?,
                    None => SHORT_SAMPLE_MS,
                },
                seed: m.get_one::<u64>("seed").copied(),
            },
            Some(("devices", _)) => Action::Devices,
            _ => unreachable!("subcommand_required is set"),
        };

        Ok(Self {
            output_device,
            action,
        })
    }
}

fn tone_action(m: &ArgMatches) -> Result<Action> {
    let mut frequency = match m.get_one::<String>("frequency") {
        Some(i) => params::parse_frequency(i)?,
        None => DEFAULT_FREQUENCY,
    };

    for _ in 0..m.get_count("octave-up") {
        frequency = params::octave_up(frequency)?;
    }
    for _ in 0..m.get_count("octave-down") {
        frequency = params::octave_down(frequency)?;
    }

    let width = match m.get_one::<String>("width") {
        Some(i) => params::parse_number(i).context("Invalid frequency width")?,
        None => 0.0,
    };

    Ok(Action::Tone {
        frequency,
        width: params::clamp_bandwidth(frequency, width),
        constant: m.get_flag("constant"),
    })
}

fn mix_tones(m: &ArgMatches) -> Result<Vec<MixTone>> {
    let list = |name: &str| {
        m.get_one::<String>(name)
            .map(|x| params::parse_list(x))
            .transpose()
            .with_context(|| format!("Invalid {name}"))
    };

    let frequencies = params::parse_frequencies(
        m.get_one::<String>("tones")
            .map(String::as_str)
            .unwrap_or_default(),
    )?;
    let gains = list("gains")?;
    let widths = list("widths")?;

    Ok(params::mix_tones(
        &frequencies,
        gains.as_deref(),
        widths.as_deref(),
    )?)
}

#[cfg(test)]
mod test {
    use tinnitone::params::ParamError;

    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        let m = command().try_get_matches_from(args)?;
        Args::from_matches(&m)
    }

    #[test]
    fn test_tone_defaults() {
        let args = parse(&["tinnitone", "tone"]).unwrap();
        assert_eq!(args.output_device, "default");
        assert_eq!(
            args.action,
            Action::Tone {
                frequency: 1000.0,
                width: 0.0,
                constant: false
            }
        );
    }

    #[test]
    fn test_tone_width_clamped_after_octave() {
        let args = parse(&[
            "tinnitone", "tone", "-f", "5000", "-w", "9000", "--octave-up", "--octave-up", "-c",
        ])
        .unwrap();
        assert_eq!(
            args.action,
            Action::Tone {
                frequency: 20000.0,
                width: 0.0,
                constant: true
            }
        );
    }

    #[test]
    fn test_tone_octave_out_of_range() {
        let err = parse(&["tinnitone", "tone", "-f", "150", "--octave-down"]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ParamError>(),
            Some(&ParamError::OctaveTooLow)
        );
    }

    #[test]
    fn test_tone_bad_frequency() {
        assert!(parse(&["tinnitone", "tone", "-f", "loud"]).is_err());
        assert!(parse(&["tinnitone", "tone", "-f", "50"]).is_err());
    }

    #[test]
    fn test_mix() {
        let args = parse(&[
            "tinnitone", "-o", "usb", "mix", "-t", "1000,2000", "-g", "100,50", "-w", "0,300",
        ])
        .unwrap();

        assert_eq!(args.output_device, "usb");
        assert_eq!(
            args.action,
            Action::Mix {
                tones: vec![
                    MixTone::new(1000.0),
                    MixTone::new(2000.0).gain(50.0).bandwidth(300.0)
                ],
                constant: false
            }
        );
    }

    #[test]
    fn test_mix_requires_tones() {
        assert!(parse(&["tinnitone", "mix"]).is_err());
        assert!(parse(&["tinnitone", "mix", "-t", ","]).is_err());
        assert!(parse(&["tinnitone", "mix", "-t", "1000", "-g", "1,2"]).is_err());
    }

    #[test]
    fn test_render() {
        let args = parse(&["tinnitone", "render", "-d", "100", "-s", "7"]).unwrap();
        assert_eq!(
            args.action,
            Action::Render {
                tones: vec![MixTone::new(1000.0)],
                duration_ms: 100.0,
                seed: Some(7)
            }
        );
    }

    #[test]
    fn test_render_rejects_unbounded_duration() {
        for duration in ["inf", "NaN", "-1", "1e300"] {
            let err = parse(&["tinnitone", "render", "-d", duration]).unwrap_err();
            assert!(err.downcast_ref::<ParamError>().is_some(), "{duration}");
        }
    }

    #[test]
    fn test_devices() {
        let args = parse(&["tinnitone", "devices"]).unwrap();
        assert_eq!(args.action, Action::Devices);
    }
}
