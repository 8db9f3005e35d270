//! Playback driver.
//!
//! Streams a finished [`Signal`] to an output device in fixed size chunks.
//! Samples are converted to 16 bit PCM right before each chunk is written,
//! and a [`CancelToken`] is checked before every write so a playing tone can be stopped.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    FromSample, Sample, SizedSample,
};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use tracing::{debug, error, info, warn};

use super::{
    devices::{self, OutputTarget},
    resample,
    signal::{to_pcm_chunk, Signal},
};

/// Number of samples written to the device at once.
pub const CHUNK_SIZE: usize = 1024;

/// How many chunks may wait for the audio callback before a write blocks.
const QUEUE_CHUNKS: usize = 4;

/// Upper bound on how long a finished stream is kept open for the device to play out.
const MAX_LATENCY: Duration = Duration::from_secs(1);

/// Shared stop flag between a playback loop and whoever controls it.
/// Cloning gives another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

/// How a playback loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every chunk of the buffer was written.
    Completed { chunks: usize },
    /// Cancellation was observed before the buffer ran out.
    Cancelled { chunks: usize },
}

/// Somewhere PCM chunks can be written to.
/// The sink is opened right before the first write and closed when dropped.
pub trait AudioSink {
    /// Writes one chunk, blocking until there is room for it.
    fn write(&mut self, chunk: &[i16]) -> Result<()>;

    /// Called after the last chunk on normal completion.
    /// Lets the sink play out anything it still has queued.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// An open cpal output stream fed through a bounded channel.
pub struct CpalSink {
    _stream: cpal::Stream,
    tx: Option<Sender<Vec<i16>>>,
    drained: Receiver<Duration>,
    drain_timeout: Duration,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl PlaybackOutcome {
    pub fn chunks(&self) -> usize {
        match self {
            Self::Completed { chunks } | Self::Cancelled { chunks } => *chunks,
        }
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Writes the signal to a sink chunk by chunk.
///
/// `open` is only called right before the first chunk, so a buffer that is cancelled
/// before it starts (or is empty) never touches the device.
/// The sink is dropped, and so closed, on every return path.
pub fn stream_chunks<S, F>(signal: &Signal, open: F, cancel: &CancelToken) -> Result<PlaybackOutcome>
where
    S: AudioSink,
    F: FnOnce() -> Result<S>,
{
    let mut chunks = signal.samples().chunks(CHUNK_SIZE);
    if cancel.is_cancelled() {
        return Ok(PlaybackOutcome::Cancelled { chunks: 0 });
    }

    let Some(first) = chunks.next() else {
        return Ok(PlaybackOutcome::Completed { chunks: 0 });
    };

    let mut sink = open()?;
    sink.write(&to_pcm_chunk(first))?;
    let mut written = 1;

    for chunk in chunks {
        if cancel.is_cancelled() {
            debug!("Playback cancelled after {written} chunks");
            return Ok(PlaybackOutcome::Cancelled { chunks: written });
        }

        sink.write(&to_pcm_chunk(chunk))?;
        written += 1;
    }

    sink.finish()?;
    Ok(PlaybackOutcome::Completed { chunks: written })
}

/// Plays a signal on the named output device (`default` for the host default).
/// Blocks until the signal has been played or `cancel` is set.
pub fn play(signal: &Signal, device: &str, cancel: &CancelToken) -> Result<PlaybackOutcome> {
    let target = devices::select_output(device, signal.sample_rate())?;

    let resampled;
    let signal = match target.sample_rate() == signal.sample_rate() {
        true => signal,
        false => {
            resampled = resample::resample(signal, target.sample_rate())?;
            &resampled
        }
    };

    let outcome = stream_chunks(signal, || CpalSink::open(&target), cancel)?;
    info!(
        "Playback {} after {} chunks",
        match outcome.was_cancelled() {
            true => "stopped",
            false => "finished",
        },
        outcome.chunks()
    );
    Ok(outcome)
}

impl CpalSink {
    /// Builds and starts an output stream on the target.
    pub fn open(target: &OutputTarget) -> Result<Self> {
        let (tx, rx) = channel::bounded::<Vec<i16>>(QUEUE_CHUNKS);
        let (drained_tx, drained) = channel::bounded::<Duration>(1);
        let feeder = ChunkFeeder::new(rx, drained_tx, target.channels());

        let stream = match target.config.sample_format() {
            cpal::SampleFormat::I16 => build_stream::<i16>(target, feeder),
            cpal::SampleFormat::F32 => build_stream::<f32>(target, feeder),
            cpal::SampleFormat::U16 => build_stream::<u16>(target, feeder),
            format => bail!("Unsupported sample format: {format:?}"),
        }?;

        stream.play().context("Failed to start output stream")?;
        debug!("Output stream opened");

        let queued = (QUEUE_CHUNKS + 1) * CHUNK_SIZE;
        let drain_timeout = frames_duration(queued, target.sample_rate()) + Duration::from_secs(1);

        Ok(Self {
            _stream: stream,
            tx: Some(tx),
            drained,
            drain_timeout,
        })
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, chunk: &[i16]) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| anyhow!("Output stream already finished"))?;
        tx.send(chunk.to_vec())
            .map_err(|_| anyhow!("Output stream closed"))
    }

    fn finish(&mut self) -> Result<()> {
        // Hanging up tells the callback no more chunks are coming
        self.tx = None;
        match self.drained.recv_timeout(self.drain_timeout) {
            // The last samples are handed off but still in the device buffer
            Ok(latency) => thread::sleep(latency.min(MAX_LATENCY)),
            Err(_) => warn!("Output stream did not drain in {:?}", self.drain_timeout),
        }
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        debug!("Output stream closed");
    }
}

/// The state behind the output callback.
/// Copies mono PCM chunks from `rx` to every channel of each frame, padding with silence.
///
/// Once the sender has hung up and a whole callback went by after the last sample was
/// written, the device latency of the current callback is sent on `drained`.
/// Signaling any earlier would let the stream close while the final buffer is still
/// waiting to be played.
struct ChunkFeeder {
    rx: Receiver<Vec<i16>>,
    drained: Sender<Duration>,
    channels: usize,
    pending: VecDeque<i16>,
    hung_up: bool,
}

impl ChunkFeeder {
    fn new(rx: Receiver<Vec<i16>>, drained: Sender<Duration>, channels: usize) -> Self {
        Self {
            rx,
            drained,
            channels: channels.max(1),
            pending: VecDeque::with_capacity(CHUNK_SIZE * 2),
            hung_up: false,
        }
    }

    /// Fills one device buffer. `latency` is how long until this buffer is heard.
    fn fill<T: Sample + FromSample<i16>>(&mut self, data: &mut [T], latency: Duration) {
        // The previous callback wrote the last samples and has returned
        if self.hung_up && self.pending.is_empty() {
            let _ = self.drained.try_send(latency);
        }

        for frame in data.chunks_mut(self.channels) {
            if self.pending.is_empty() && !self.hung_up {
                match self.rx.try_recv() {
                    Ok(chunk) => self.pending.extend(chunk),
                    Err(TryRecvError::Disconnected) => self.hung_up = true,
                    Err(TryRecvError::Empty) => {}
                }
            }

            let sample = match self.pending.pop_front() {
                Some(i) => T::from_sample(i),
                None => T::EQUILIBRIUM,
            };
            frame.fill(sample);
        }
    }
}

/// Builds an output stream driven by `feeder`.
fn build_stream<T>(target: &OutputTarget, mut feeder: ChunkFeeder) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<i16>,
{
    let channels = target.channels().max(1);
    let sample_rate = target.sample_rate();

    target
        .device
        .build_output_stream(
            &target.config.config(),
            move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                let timestamp = info.timestamp();
                let latency = timestamp
                    .playback
                    .duration_since(&timestamp.callback)
                    .unwrap_or_else(|| frames_duration(data.len() / channels, sample_rate));
                feeder.fill(data, latency);
            },
            |err| error!("Output stream error: {err}"),
            None,
        )
        .context("Failed to build output stream")
}

fn frames_duration(frames: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(frames as f64 / sample_rate.max(1) as f64)
}
