//! Rate-limited synthesizer wrapper.
//!
//! Wraps any SpeechSynthesizer implementation with rate limiting using the governor crate.

use async_trait::async_trait;
use bytes::Bytes;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::config::VoiceConfig;
use crate::error::SynthesisError;
use crate::traits::synthesizer::SpeechSynthesizer;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A synthesizer wrapper that enforces a request rate.
///
/// Every attempt, retries included, waits for a permit, so concurrent
/// workers share one budget.
pub struct RateLimitedSynthesizer<S: SpeechSynthesizer> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
}

impl<S: SpeechSynthesizer> RateLimitedSynthesizer<S> {
    /// Create a new rate-limited synthesizer.
    pub fn new(synthesizer: S, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(synthesizer, Quota::per_second(requests_per_second))
    }

    /// Create with a custom quota.
    pub fn with_quota(synthesizer: S, quota: Quota) -> Self {
        Self {
            inner: synthesizer,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SpeechSynthesizer> SpeechSynthesizer for RateLimitedSynthesizer<S> {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Bytes, SynthesisError> {
        self.limiter.until_ready().await;
        self.inner.synthesize(text, voice).await
    }
}

/// Extension trait for easy rate limiting.
pub trait SynthesizerExt: SpeechSynthesizer + Sized {
    /// Wrap this synthesizer with rate limiting.
    fn rate_limited(self, requests_per_second: NonZeroU32) -> RateLimitedSynthesizer<Self> {
        RateLimitedSynthesizer::new(self, requests_per_second)
    }
}

impl<S: SpeechSynthesizer + Sized> SynthesizerExt for S {}
