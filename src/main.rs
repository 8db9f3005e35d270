use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{error, info};

use tinnitone::{
    audio::{
        devices, mix, mix_with, playback, synthesize, worker::ToneWorker, CancelToken, MixSpec,
        PlaybackOutcome, Signal, ToneSpec,
    },
    params::{CONSTANT_TONE_MS, SAMPLE_RATE, SHORT_SAMPLE_MS},
};

mod args;
mod console;

use args::Action;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = args::parse_args()?;
    let device = args.output_device;

    match args.action {
        Action::Tone {
            frequency,
            width,
            constant,
        } => {
            info!("Playing {frequency} Hz tone, width {width} Hz");
            let spec = move |duration_ms| {
                ToneSpec::new(frequency, duration_ms, SAMPLE_RATE).bandwidth(width)
            };

            match constant {
                true => play_constant(device, move || synthesize(&spec(CONSTANT_TONE_MS)))?,
                false => play_short(&synthesize(&spec(SHORT_SAMPLE_MS)), &device)?,
            }
        }
        Action::Mix { tones, constant } => {
            info!("Playing mix of {} tones", tones.len());
            let spec =
                move |duration_ms| MixSpec::new(duration_ms, SAMPLE_RATE).with_tones(tones.clone());

            match constant {
                true => play_constant(device, move || mix(&spec(CONSTANT_TONE_MS)))?,
                false => play_short(&mix(&spec(SHORT_SAMPLE_MS)), &device)?,
            }
        }
        Action::Render {
            tones,
            duration_ms,
            seed,
        } => {
            let spec = MixSpec::new(duration_ms, SAMPLE_RATE).with_tones(tones);
            let signal = match seed {
                Some(seed) => mix_with(&spec, &mut StdRng::seed_from_u64(seed)),
                None => mix(&spec),
            };
            println!("{}", serde_json::to_string_pretty(&signal.stats())?);
        }
        Action::Devices => {
            for (i, name) in devices::output_device_names()?.iter().enumerate() {
                println!("{i}: {name}");
            }
        }
    }

    Ok(())
}

fn play_short(signal: &Signal, device: &str) -> Result<()> {
    let outcome = playback::play(signal, device, &CancelToken::new())?;
    log_outcome(&outcome);
    Ok(())
}

/// Synthesizes and plays a long buffer on a worker thread until it ends or a key is pressed.
fn play_constant<F>(device: String, build: F) -> Result<()>
where
    F: FnOnce() -> Signal + Send + 'static,
{
    let worker = ToneWorker::new("constant");
    worker.toggle(move |cancel| {
        let signal = build();
        if cancel.is_cancelled() {
            return Ok(PlaybackOutcome::Cancelled { chunks: 0 });
        }
        playback::play(&signal, &device, cancel)
    })?;

    println!("Playing constant tone, press any key to stop.");
    console::wait_for_key(&worker)?;

    match worker.join() {
        Some(Ok(outcome)) => log_outcome(&outcome),
        Some(Err(e)) => error!("Playback failed: {e:#}"),
        None => {}
    }

    Ok(())
}

fn log_outcome(outcome: &PlaybackOutcome) {
    match outcome {
        PlaybackOutcome::Completed { chunks } => info!("Done, played {chunks} chunks"),
        PlaybackOutcome::Cancelled { chunks } => info!("Stopped after {chunks} chunks"),
    }
}
