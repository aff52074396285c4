//! Audio capture for analysis: format negotiation, the recorder child
//! process and the record/preview/submit state machine.

pub mod error;
pub mod format;
pub mod input;
pub mod recorder;

pub use error::CaptureError;
pub use format::{pick_format, AudioFormat, Codec, PREFERRED_FORMATS};
pub use input::{AudioInput, CaptureConstraints, ProcessInput, Toolset};
pub use recorder::{AudioSource, CapturedAudio, Phase, Recorder};
