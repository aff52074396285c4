//! Microphone input backed by a recorder child process.
//!
//! `ffmpeg` handles the compressed formats and `arecord` the WAV fallback.
//! The recorder is stopped with SIGINT so that it writes the container
//! trailer before exiting.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::format::{AudioFormat, Codec};

/// How long a recorder gets to flush after SIGINT before it is killed.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Processing applied while capturing.  Everything is off by default so the
/// high-frequency detail of bird calls reaches the classifier untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub noise_suppression: bool,
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub channels: u16,
    pub sample_rate: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            noise_suppression: false,
            echo_cancellation: false,
            auto_gain_control: false,
            channels: 1,
            sample_rate: 48_000,
        }
    }
}

/// A source of recorded audio.
pub trait AudioInput: Send {
    fn supports(&self, format: &AudioFormat) -> bool;
    /// Acquire the device and start capturing.
    fn open(&mut self, format: &AudioFormat, constraints: &CaptureConstraints) -> Result<(), CaptureError>;
    /// Stop capturing and return the encoded bytes.
    fn finish(&mut self) -> Result<Vec<u8>, CaptureError>;
    /// Drop any open device without producing audio.  Idempotent.
    fn release(&mut self);
    fn is_open(&self) -> bool;
}

// ── tool detection ───────────────────────────────────────────────────────

/// Recorder tools found on this host.
#[derive(Debug, Clone, Default)]
pub struct Toolset {
    pub ffmpeg: bool,
    pub arecord: bool,
    /// Output of `ffmpeg -encoders`.
    pub encoders: String,
}

impl Toolset {
    pub fn detect() -> Self {
        let encoders = Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()
            .filter(|o| o.status.success())
            .map(|o| String::from_utf8_lossy(&o.stdout).into_owned());

        let arecord = Command::new("arecord")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);

        let tools = Toolset {
            ffmpeg: encoders.is_some(),
            arecord,
            encoders: encoders.unwrap_or_default(),
        };
        debug!("Recorder tools: ffmpeg={} arecord={}", tools.ffmpeg, tools.arecord);
        tools
    }

    pub fn supports(&self, format: &AudioFormat) -> bool {
        match format.codec {
            Codec::Aac => self.ffmpeg && has_encoder(&self.encoders, "aac"),
            Codec::Opus => self.ffmpeg && has_encoder(&self.encoders, "libopus"),
            Codec::Pcm => self.arecord || self.ffmpeg,
        }
    }
}

/// `ffmpeg -encoders` rows look like ` A....D aac   AAC (Advanced Audio Coding)`.
fn has_encoder(list: &str, name: &str) -> bool {
    list.lines()
        .any(|l| l.split_whitespace().nth(1) == Some(name))
}

// ── process input ────────────────────────────────────────────────────────

struct ActiveRecording {
    child: Child,
    path: PathBuf,
    tool: &'static str,
}

pub struct ProcessInput {
    device: Option<String>,
    scratch_dir: PathBuf,
    tools: Toolset,
    active: Option<ActiveRecording>,
}

impl ProcessInput {
    /// Probe the host for recorder tools.
    pub fn new(device: Option<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self::with_tools(device, scratch_dir, Toolset::detect())
    }

    pub fn with_tools(device: Option<String>, scratch_dir: impl Into<PathBuf>, tools: Toolset) -> Self {
        Self {
            device,
            scratch_dir: scratch_dir.into(),
            tools,
            active: None,
        }
    }

    fn build_command(
        &self,
        format: &AudioFormat,
        constraints: &CaptureConstraints,
        out: &Path,
    ) -> (&'static str, Command) {
        let filters = audio_filters(constraints);

        if format.codec == Codec::Pcm && self.tools.arecord && (filters.is_empty() || !self.tools.ffmpeg) {
            let mut cmd = Command::new("arecord");
            cmd.args([
                "-q",
                "-f",
                "S16_LE",
                format!("-c{}", constraints.channels).as_str(),
                format!("-r{}", constraints.sample_rate).as_str(),
                "-t",
                "wav",
            ]);
            if let Some(card) = &self.device {
                cmd.args(["-D", card.as_str()]);
            }
            cmd.arg(out);
            return ("arecord", cmd);
        }

        let codec = match format.codec {
            Codec::Aac => "aac",
            Codec::Opus => "libopus",
            Codec::Pcm => "pcm_s16le",
        };
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"]);
        cmd.args(["-f", "alsa", "-i", self.device.as_deref().unwrap_or("default")]);
        cmd.args([
            "-ac",
            constraints.channels.to_string().as_str(),
            "-ar",
            constraints.sample_rate.to_string().as_str(),
        ]);
        if !filters.is_empty() {
            cmd.args(["-af", filters.join(",").as_str()]);
        }
        cmd.args(["-c:a", codec, "-f", format.container]);
        cmd.arg(out);
        ("ffmpeg", cmd)
    }

    fn scratch_path(&self, format: &AudioFormat) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.scratch_dir.join(format!(
            "birdia-{}-{millis}.{}",
            std::process::id(),
            format.extension
        ))
    }
}

fn audio_filters(constraints: &CaptureConstraints) -> Vec<&'static str> {
    let mut filters = Vec::new();
    if constraints.noise_suppression {
        filters.push("afftdn");
    }
    if constraints.auto_gain_control {
        filters.push("dynaudnorm");
    }
    if constraints.echo_cancellation {
        warn!("Echo cancellation requested but no recorder filter provides it – ignored");
    }
    filters
}

impl AudioInput for ProcessInput {
    fn supports(&self, format: &AudioFormat) -> bool {
        self.tools.supports(format)
    }

    fn open(&mut self, format: &AudioFormat, constraints: &CaptureConstraints) -> Result<(), CaptureError> {
        if self.active.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        std::fs::create_dir_all(&self.scratch_dir).map_err(|source| CaptureError::Io {
            path: self.scratch_dir.clone(),
            source,
        })?;

        let path = self.scratch_path(format);
        let (tool, mut cmd) = self.build_command(format, constraints, &path);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|source| CaptureError::Spawn { tool, source })?;

        // Drain stderr so device errors show up in the log and the pipe
        // never fills up.
        if let Some(stderr) = child.stderr.take() {
            std::thread::Builder::new()
                .name(format!("{tool}-stderr"))
                .spawn(move || {
                    let reader = BufReader::new(stderr);
                    for line in reader.lines() {
                        match line {
                            Ok(l) if l.is_empty() => {}
                            Ok(l) => warn!("[{tool}] {l}"),
                            Err(_) => break,
                        }
                    }
                    debug!("{tool} stderr stream ended");
                })
                .ok();
        }

        // Give the recorder a moment to fail on a missing or busy device.
        std::thread::sleep(Duration::from_millis(300));
        match child.try_wait() {
            Ok(Some(status)) => {
                std::fs::remove_file(&path).ok();
                return Err(CaptureError::DeviceUnavailable(format!(
                    "{tool} exited immediately with {status} – check REC_CARD \
                     (run 'arecord -l' to list capture devices)"
                )));
            }
            Ok(None) => {}
            Err(e) => warn!("Cannot check {tool} status: {e}"),
        }

        info!(
            "{tool} recording {} (pid={}, device={})",
            format.mime,
            child.id(),
            self.device.as_deref().unwrap_or("default")
        );
        self.active = Some(ActiveRecording { child, path, tool });
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>, CaptureError> {
        let mut active = self.active.take().ok_or(CaptureError::NotRecording)?;

        interrupt(&mut active.child);
        wait_or_kill(&mut active.child, active.tool, STOP_TIMEOUT);

        let bytes = std::fs::read(&active.path).map_err(|source| CaptureError::Io {
            path: active.path.clone(),
            source,
        });
        std::fs::remove_file(&active.path).ok();
        let bytes = bytes?;

        if bytes.is_empty() {
            return Err(CaptureError::EmptyRecording);
        }
        debug!("{} finished: {} bytes", active.tool, bytes.len());
        Ok(bytes)
    }

    fn release(&mut self) {
        if let Some(mut active) = self.active.take() {
            let _ = active.child.kill();
            let _ = active.child.wait();
            std::fs::remove_file(&active.path).ok();
            debug!("{} released", active.tool);
        }
    }

    fn is_open(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for ProcessInput {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn interrupt(child: &mut Child) {
    // SAFETY: plain signal delivery to a pid we spawned and still own.
    let rc = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGINT) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) {
    let _ = child.kill();
}

fn wait_or_kill(child: &mut Child, tool: &str, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("{tool} exited with {status}");
                return;
            }
            Ok(None) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(50));
            }
            Ok(None) => {
                warn!("{tool} did not stop within {timeout:?} – killing");
                let _ = child.kill();
                let _ = child.wait();
                return;
            }
            Err(e) => {
                warn!("Cannot wait for {tool}: {e}");
                let _ = child.kill();
                return;
            }
        }
    }
}
