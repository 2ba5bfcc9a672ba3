//! Pure OpenAI REST API client
//!
//! A clean, minimal client for the OpenAI text-to-speech API with no
//! domain-specific logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, SpeechRequest};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let audio = client
//!     .create_speech(&SpeechRequest::new("tts-1", "nova").input("Hello!"))
//!     .await?;
//! tokio::fs::write("hello.mp3", &audio).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Apply a per-request timeout to every call made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAIError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Text-to-speech.
    ///
    /// Returns the encoded audio exactly as sent by the API, in the
    /// request's `response_format` (mp3 when unset).
    pub async fn create_speech(&self, request: &SpeechRequest) -> Result<Bytes> {
        if request.input.trim().is_empty() {
            return Err(OpenAIError::Config("speech input is empty".into()));
        }

        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI speech request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(error_text);
            warn!(status = %status, error = %message, "OpenAI speech API error");
            return Err(OpenAIError::from_status(status.as_u16(), message));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| OpenAIError::Network(e.to_string()))?;

        if audio.is_empty() {
            return Err(OpenAIError::Parse("OpenAI returned an empty audio body".into()));
        }

        debug!(
            model = %request.model,
            voice = %request.voice,
            bytes = audio.len(),
            duration_ms = start.elapsed().as_millis(),
            "OpenAI speech synthesis"
        );

        Ok(audio)
    }
}
