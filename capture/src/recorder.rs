use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::CaptureError;
use crate::format::{mime_for_path, pick_format, AudioFormat};
use crate::input::{AudioInput, CaptureConstraints};

/// Name recorded clips are uploaded under, plus the format's extension.
pub const RECORDING_STEM: &str = "grabacion_birdia";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSource {
    Recorded,
    Uploaded,
}

/// Audio held for preview and submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAudio {
    pub source: AudioSource,
    pub mime: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl CapturedAudio {
    pub fn recorded(format: &AudioFormat, bytes: Vec<u8>) -> Self {
        Self {
            source: AudioSource::Recorded,
            mime: format.base_mime().to_string(),
            file_name: format!("{RECORDING_STEM}.{}", format.extension),
            bytes,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CaptureError> {
        let bytes = std::fs::read(path).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(CaptureError::EmptyRecording);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        Ok(Self {
            source: AudioSource::Uploaded,
            mime: mime_for_path(path).to_string(),
            file_name,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Playback length, only known for WAV.
    pub fn duration(&self) -> Option<Duration> {
        if self.mime != "audio/wav" {
            return None;
        }
        wav_duration(&self.bytes)
    }
}

pub fn wav_duration(bytes: &[u8]) -> Option<Duration> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).ok()?;
    let rate = reader.spec().sample_rate;
    if rate == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(reader.duration() as f64 / rate as f64))
}

// ── state machine ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Recording,
    Captured,
    Submitting,
    Done,
}

enum State {
    Idle,
    Recording { format: AudioFormat, started: Instant },
    Captured(CapturedAudio),
    Submitting(CapturedAudio),
    Done,
}

/// Recording widget: owns the input device and at most one capture.
pub struct Recorder {
    input: Box<dyn AudioInput>,
    constraints: CaptureConstraints,
    state: State,
}

impl Recorder {
    pub fn new(input: Box<dyn AudioInput>) -> Self {
        Self::with_constraints(input, CaptureConstraints::default())
    }

    pub fn with_constraints(input: Box<dyn AudioInput>, constraints: CaptureConstraints) -> Self {
        Self {
            input,
            constraints,
            state: State::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Recording { .. } => Phase::Recording,
            State::Captured(_) => Phase::Captured,
            State::Submitting(_) => Phase::Submitting,
            State::Done => Phase::Done,
        }
    }

    /// Recording is offered only while no capture is held.
    pub fn can_record(&self) -> bool {
        matches!(self.state, State::Idle | State::Done)
    }

    pub fn capture(&self) -> Option<&CapturedAudio> {
        match &self.state {
            State::Captured(a) | State::Submitting(a) => Some(a),
            _ => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match &self.state {
            State::Recording { started, .. } => Some(started.elapsed()),
            _ => None,
        }
    }

    pub fn start_recording(&mut self) -> Result<AudioFormat, CaptureError> {
        match self.state {
            State::Idle | State::Done => {}
            State::Recording { .. } => return Err(CaptureError::AlreadyRecording),
            State::Captured(_) => return Err(CaptureError::PreviewPresent),
            State::Submitting(_) => return Err(CaptureError::SubmissionInFlight),
        }
        let format = pick_format(|f| self.input.supports(f)).ok_or(CaptureError::NoCompatibleFormat)?;
        if let Err(e) = self.input.open(&format, &self.constraints) {
            self.input.release();
            return Err(e);
        }
        info!("Recording started ({})", format.mime);
        self.state = State::Recording {
            format,
            started: Instant::now(),
        };
        Ok(format)
    }

    pub fn stop_recording(&mut self) -> Result<&CapturedAudio, CaptureError> {
        let State::Recording { format, started } = self.state else {
            return Err(CaptureError::NotRecording);
        };
        let result = self.input.finish();
        self.input.release();
        self.state = State::Idle;
        let bytes = result?;

        debug!("Recording stopped after {:?}: {} bytes", started.elapsed(), bytes.len());
        self.state = State::Captured(CapturedAudio::recorded(&format, bytes));
        self.capture().ok_or(CaptureError::NothingCaptured)
    }

    /// Use an existing file instead of the microphone.
    pub fn select_file(&mut self, path: &Path) -> Result<&CapturedAudio, CaptureError> {
        match self.state {
            State::Recording { .. } => return Err(CaptureError::AlreadyRecording),
            State::Submitting(_) => return Err(CaptureError::SubmissionInFlight),
            State::Idle | State::Captured(_) | State::Done => {}
        }
        let audio = CapturedAudio::from_file(path)?;
        info!("Selected {} ({} bytes)", audio.file_name, audio.len());
        self.state = State::Captured(audio);
        self.capture().ok_or(CaptureError::NothingCaptured)
    }

    /// Discard the held capture.
    pub fn clear(&mut self) -> Result<(), CaptureError> {
        match self.state {
            State::Recording { .. } => Err(CaptureError::AlreadyRecording),
            State::Submitting(_) => Err(CaptureError::SubmissionInFlight),
            _ => {
                self.state = State::Idle;
                Ok(())
            }
        }
    }

    /// Lock the capture for upload.  Fails without touching state when
    /// nothing is held.
    pub fn begin_submit(&mut self) -> Result<CapturedAudio, CaptureError> {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Captured(audio) => {
                let out = audio.clone();
                self.state = State::Submitting(audio);
                Ok(out)
            }
            State::Submitting(audio) => {
                self.state = State::Submitting(audio);
                Err(CaptureError::SubmissionInFlight)
            }
            other => {
                self.state = other;
                Err(CaptureError::NothingCaptured)
            }
        }
    }

    /// Success drops the capture; failure returns it for another try.
    pub fn finish_submit(&mut self, ok: bool) {
        if let State::Submitting(audio) = std::mem::replace(&mut self.state, State::Idle) {
            self.state = if ok { State::Done } else { State::Captured(audio) };
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.input.release();
    }
}
