use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    terminal,
};
use tracing::info;

use tinnitone::audio::worker::ToneWorker;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Blocks until the worker's job ends or any key is pressed.
/// A key press asks the job to stop, the caller still has to join it.
pub fn wait_for_key(worker: &ToneWorker) -> Result<()> {
    let _raw = RawMode::enable()?;

    while worker.is_active() {
        // Returns if there are no events to process
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        if let Event::Key(e) = event::read()? {
            if e.kind == KeyEventKind::Press {
                info!("Key pressed, stopping");
                worker.stop();
                break;
            }
        }
    }

    Ok(())
}

/// Raw mode for as long as this lives.
/// Dropping it restores the terminal, also when unwinding.
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
