//! OpenAI implementation of the speech synthesis trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use narrator::synth::OpenAISpeech;
//!
//! let speech = OpenAISpeech::new(OpenAIClient::from_env()?);
//! let audio = speech.synthesize("Hello", &VoiceConfig::default()).await?;
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use openai_client::{OpenAIClient, OpenAIError, SpeechRequest};

use crate::config::VoiceConfig;
use crate::error::SynthesisError;
use crate::traits::synthesizer::SpeechSynthesizer;

/// Speech synthesis through OpenAI's `/audio/speech` endpoint.
#[derive(Clone)]
pub struct OpenAISpeech {
    client: OpenAIClient,
}

impl OpenAISpeech {
    pub fn new(client: OpenAIClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Bytes, SynthesisError> {
        let mut request = SpeechRequest::new(&voice.model, &voice.voice)
            .input(text)
            .response_format(voice.response_format);
        if let Some(speed) = voice.speed {
            request = request.speed(speed);
        }

        self.client
            .create_speech(&request)
            .await
            .map_err(SynthesisError::from)
    }
}

impl From<OpenAIError> for SynthesisError {
    fn from(err: OpenAIError) -> Self {
        let retryable = err.is_retryable();
        match err {
            OpenAIError::Unauthorized(msg) => SynthesisError::Unauthorized(msg),
            OpenAIError::RateLimited(msg) => SynthesisError::RateLimited(msg),
            OpenAIError::Network(msg) => SynthesisError::Network(msg),
            other => SynthesisError::Provider {
                message: other.to_string(),
                retryable,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Transient;

    #[test]
    fn test_error_mapping_preserves_retryability() {
        let err: SynthesisError = OpenAIError::from_status(429, "quota".into()).into();
        assert!(matches!(err, SynthesisError::RateLimited(_)));
        assert!(err.is_transient());

        let err: SynthesisError = OpenAIError::from_status(500, "oops".into()).into();
        assert!(err.is_transient());

        let err: SynthesisError = OpenAIError::from_status(400, "input too long".into()).into();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("input too long"));

        let err: SynthesisError = OpenAIError::Unauthorized("bad key".into()).into();
        assert!(matches!(err, SynthesisError::Unauthorized(_)));
    }
}
