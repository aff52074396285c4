//! Ctrl-C: stops a running recording, otherwise exits.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::info;

static RECORDING: AtomicBool = AtomicBool::new(false);
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn install() -> Result<()> {
    ctrlc::set_handler(|| {
        if RECORDING.load(Ordering::Relaxed) {
            STOP_REQUESTED.store(true, Ordering::Relaxed);
            info!("Stopping recording");
        } else {
            eprintln!();
            std::process::exit(130);
        }
    })
    .context("Cannot set Ctrl-C handler")
}

pub fn stop_requested() -> bool {
    STOP_REQUESTED.load(Ordering::Relaxed)
}

/// Routes Ctrl-C to the recording while alive.
pub struct RecordingGuard;

impl RecordingGuard {
    pub fn begin() -> Self {
        STOP_REQUESTED.store(false, Ordering::Relaxed);
        RECORDING.store(true, Ordering::Relaxed);
        RecordingGuard
    }
}

impl Drop for RecordingGuard {
    fn drop(&mut self) {
        RECORDING.store(false, Ordering::Relaxed);
        STOP_REQUESTED.store(false, Ordering::Relaxed);
    }
}
