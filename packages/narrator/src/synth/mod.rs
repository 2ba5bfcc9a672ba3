//! Speech synthesis: provider implementations and the step that persists
//! synthesized audio to local storage.

pub mod openai;
pub mod rate_limited;

pub use openai::OpenAISpeech;
pub use rate_limited::{RateLimitedSynthesizer, SynthesizerExt};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::VoiceConfig;
use crate::error::SynthesisError;
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::synthesizer::SpeechSynthesizer;

/// Synthesizes row text and writes the audio to disk.
pub struct MediaSynthesizer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voice: VoiceConfig,
    retry: RetryPolicy,
}

impl MediaSynthesizer {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, voice: VoiceConfig, retry: RetryPolicy) -> Self {
        Self {
            synthesizer,
            voice,
            retry,
        }
    }

    pub fn voice(&self) -> &VoiceConfig {
        &self.voice
    }

    /// Synthesize `text` and write it to `destination`, creating parent
    /// directories as needed. Returns the written path.
    ///
    /// Empty text is rejected without calling the provider. Transient provider
    /// failures are retried per the configured policy.
    pub async fn synthesize(&self, text: &str, destination: &Path) -> Result<PathBuf, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let audio = with_retry(&self.retry, "speech synthesis", || {
            self.synthesizer.synthesize(text, &self.voice)
        })
        .await?;

        let write_error = |source| SynthesisError::Write {
            path: destination.to_path_buf(),
            source,
        };
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
        }
        tokio::fs::write(destination, &audio).await.map_err(write_error)?;

        debug!(path = %destination.display(), bytes = audio.len(), "Audio written");
        Ok(destination.to_path_buf())
    }
}
