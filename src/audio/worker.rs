//! Background synthesis and playback.
//!
//! A [`ToneWorker`] backs one "play constant tone" control.
//! It runs at most one job at a time on its own thread, and toggling it while a job is
//! running asks that job to stop instead of starting another.

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::playback::{CancelToken, PlaybackOutcome};

/// Owns the single background job of one control.
pub struct ToneWorker {
    name: &'static str,
    active: Mutex<Option<ActiveJob>>,
}

struct ActiveJob {
    cancel: CancelToken,
    handle: JoinHandle<Result<PlaybackOutcome>>,
}

/// What a call to [`ToneWorker::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Nothing was running, so a new job was started.
    Started,
    /// A job was running and has been asked to stop.
    Stopping,
}

impl ToneWorker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            active: Mutex::new(None),
        }
    }

    /// If a job is still running it is asked to stop, otherwise `job` is started
    /// on a new thread with a fresh [`CancelToken`].
    pub fn toggle<J>(&self, job: J) -> Result<Toggle>
    where
        J: FnOnce(&CancelToken) -> Result<PlaybackOutcome> + Send + 'static,
    {
        let mut active = self.active.lock();
        if let Some(running) = active.as_ref().filter(|x| !x.handle.is_finished()) {
            debug!("[{}] Stopping running job", self.name);
            running.cancel.cancel();
            return Ok(Toggle::Stopping);
        }

        // Reap the last job before replacing it
        if let Some(done) = active.take() {
            log_result(self.name, done.join());
        }

        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name(format!("tone-worker-{}", self.name))
            .spawn(move || job(&token))
            .context("Failed to spawn tone worker")?;

        info!("[{}] Started job", self.name);
        *active = Some(ActiveJob { cancel, handle });
        Ok(Toggle::Started)
    }

    /// Whether a job has been started and has not finished yet.
    pub fn is_active(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|x| !x.handle.is_finished())
            .unwrap_or(false)
    }

    /// Asks the running job, if any, to stop. Does not wait for it.
    pub fn stop(&self) {
        if let Some(job) = self.active.lock().as_ref() {
            job.cancel.cancel();
        }
    }

    /// Waits for the current job to end and returns its result.
    /// Returns `None` if no job was started since the last join.
    pub fn join(&self) -> Option<Result<PlaybackOutcome>> {
        let job = self.active.lock().take()?;
        Some(job.join())
    }
}

impl ActiveJob {
    fn join(self) -> Result<PlaybackOutcome> {
        self.handle
            .join()
            .map_err(|_| anyhow!("Tone worker panicked"))?
    }
}

impl Drop for ToneWorker {
    fn drop(&mut self) {
        if let Some(job) = self.active.get_mut().take() {
            job.cancel.cancel();
            log_result(self.name, job.join());
        }
    }
}

fn log_result(name: &str, result: Result<PlaybackOutcome>) {
    match result {
        Ok(outcome) => debug!("[{name}] Job ended: {outcome:?}"),
        Err(e) => error!("[{name}] Job failed: {e:#}"),
    }
}
