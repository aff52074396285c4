//! Recording formats, in order of preference.

use std::path::Path;

/// Codec family, which decides the recorder tool and its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Aac,
    Opus,
    Pcm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Full MIME type, possibly with a `codecs` parameter.
    pub mime: &'static str,
    pub extension: &'static str,
    pub codec: Codec,
    /// Container name as understood by `ffmpeg -f`.
    pub container: &'static str,
}

impl AudioFormat {
    /// MIME type without parameters, as sent in the upload.
    pub fn base_mime(&self) -> &'static str {
        self.mime.split(';').next().unwrap_or(self.mime)
    }
}

/// AAC in MP4 first: it is the only one Safari/iOS players can open.
pub const PREFERRED_FORMATS: [AudioFormat; 4] = [
    AudioFormat {
        mime: "audio/mp4",
        extension: "mp4",
        codec: Codec::Aac,
        container: "mp4",
    },
    AudioFormat {
        mime: "audio/webm;codecs=opus",
        extension: "webm",
        codec: Codec::Opus,
        container: "webm",
    },
    AudioFormat {
        mime: "audio/ogg;codecs=opus",
        extension: "ogg",
        codec: Codec::Opus,
        container: "ogg",
    },
    AudioFormat {
        mime: "audio/wav",
        extension: "wav",
        codec: Codec::Pcm,
        container: "wav",
    },
];

/// First preferred format accepted by `supports`.
pub fn pick_format(supports: impl Fn(&AudioFormat) -> bool) -> Option<AudioFormat> {
    PREFERRED_FORMATS.iter().find(|f| supports(f)).copied()
}

/// MIME type for an uploaded file, from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "wav" | "wave" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" | "aac" => "audio/mp4",
        "webm" => "audio/webm",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_prefers_mp4() {
        let f = pick_format(|_| true).unwrap();
        assert_eq!(f.mime, "audio/mp4");
    }

    #[test]
    fn test_pick_falls_back() {
        let f = pick_format(|f| f.codec == Codec::Opus).unwrap();
        assert_eq!(f.extension, "webm");
        assert_eq!(f.base_mime(), "audio/webm");

        let f = pick_format(|f| f.codec == Codec::Pcm).unwrap();
        assert_eq!(f.mime, "audio/wav");

        assert!(pick_format(|_| false).is_none());
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("/tmp/a.WAV")), "audio/wav");
        assert_eq!(mime_for_path(Path::new("call.m4a")), "audio/mp4");
        assert_eq!(mime_for_path(Path::new("call")), "application/octet-stream");
    }
}
