//! OpenAI API request and response types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Text-to-speech
// =============================================================================

/// Encoded audio formats accepted by `/audio/speech`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
    Pcm,
}

impl AudioFormat {
    /// MIME type of the encoded payload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Pcm => "audio/pcm",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
        }
    }
}

/// Speech synthesis request.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest {
    /// Model to use (e.g., "tts-1", "tts-1-hd")
    pub model: String,

    /// Voice preset (e.g., "alloy", "nova")
    pub voice: String,

    /// Text to synthesize
    pub input: String,

    /// Encoding of the returned audio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<AudioFormat>,

    /// Playback speed (0.25 to 4.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl Default for SpeechRequest {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "nova".to_string(),
            input: String::new(),
            response_format: None,
            speed: None,
        }
    }
}

impl SpeechRequest {
    /// Create a new speech request for the given model and voice.
    pub fn new(model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            voice: voice.into(),
            ..Default::default()
        }
    }

    /// Set the text to synthesize.
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// Set the response format.
    pub fn response_format(mut self, format: AudioFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    /// Set playback speed.
    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
