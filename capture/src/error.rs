use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("no supported recording format on this device")]
    NoCompatibleFormat,
    #[error("an audio capture is already held; clear it first")]
    PreviewPresent,
    #[error("already recording")]
    AlreadyRecording,
    #[error("not recording")]
    NotRecording,
    #[error("no audio to process")]
    NothingCaptured,
    #[error("a submission is already in progress")]
    SubmissionInFlight,
    #[error("the recording is empty")]
    EmptyRecording,
    #[error("cannot start recorder `{tool}`: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
