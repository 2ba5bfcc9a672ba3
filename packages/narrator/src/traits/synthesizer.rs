//! Speech synthesis trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::VoiceConfig;
use crate::error::SynthesisError;

/// Turns text into encoded audio.
///
/// Implementations perform exactly one provider call per invocation;
/// timeouts and retries are applied by the caller.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice options.
    ///
    /// Returns the encoded audio in `voice.response_format`.
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Bytes, SynthesisError>;
}
