//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the pipeline without making real speech
//! or storage calls.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::config::VoiceConfig;
use crate::error::{SynthesisError, UploadError};
use crate::traits::{store::ObjectStore, synthesizer::SpeechSynthesizer};

/// A mock synthesizer for testing.
///
/// Returns deterministic audio derived from the input text. Specific texts can
/// be configured to fail permanently or a number of times transiently.
#[derive(Default)]
pub struct MockSynthesizer {
    /// Texts that always fail with a non-retryable provider error
    failures: Arc<RwLock<HashSet<String>>>,

    /// Texts that fail with a rate limit this many more times
    transient: Arc<RwLock<HashMap<String, u32>>>,

    /// Artificial latency per call
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audio returned for `text`.
    pub fn audio_for(text: &str) -> Bytes {
        Bytes::from(format!("ID3:{}", text))
    }

    /// Make every request for `text` fail permanently.
    pub fn with_failure(self, text: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(text.into());
        self
    }

    /// Make the next `times` requests for `text` fail with a rate limit.
    pub fn with_transient_failures(self, text: impl Into<String>, times: u32) -> Self {
        self.transient.write().unwrap().insert(text.into(), times);
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Texts of all calls made, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<Bytes, SynthesisError> {
        self.calls.write().unwrap().push(text.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failures.read().unwrap().contains(text) {
            return Err(SynthesisError::Provider {
                message: format!("mock failure for {:?}", text),
                retryable: false,
            });
        }

        {
            let mut transient = self.transient.write().unwrap();
            if let Some(remaining) = transient.get_mut(text) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SynthesisError::RateLimited("mock rate limit".into()));
                }
            }
        }

        Ok(Self::audio_for(text))
    }
}

/// Record of a call made to the mock store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create {
        name: String,
        folder_id: String,
        size: usize,
    },
    Grant {
        object_id: String,
    },
}

/// An object stored in the mock.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub name: String,
    pub folder_id: String,
    pub content: Bytes,
    pub mime_type: String,
    pub public: bool,
}

/// A mock object store for testing.
///
/// Assigns ids `obj-1`, `obj-2`, ... in creation order and keeps every
/// created object in memory.
#[derive(Default)]
pub struct MockObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    next_id: AtomicU64,

    /// Create calls that fail with a rate limit before succeeding
    rate_limits: Arc<RwLock<u32>>,

    /// Create calls that store the object but lose the response
    lost_responses: Arc<RwLock<u32>>,

    /// Latency added to every create call
    delay: Option<Duration>,

    /// Object names whose creation fails permanently
    rejected_names: Arc<RwLock<HashSet<String>>>,

    /// Every call fails as unauthorized
    unauthorized: bool,

    calls: Arc<RwLock<Vec<StoreCall>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` create calls with a rate limit.
    pub fn with_rate_limits(self, times: u32) -> Self {
        *self.rate_limits.write().unwrap() = times;
        self
    }

    /// Store the next `times` created objects but fail the calls with a
    /// timeout, as if the response never arrived.
    pub fn with_lost_responses(self, times: u32) -> Self {
        *self.lost_responses.write().unwrap() = times;
        self
    }

    /// Add latency to every create call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject creation of objects named `name`.
    pub fn with_rejected_name(self, name: impl Into<String>) -> Self {
        self.rejected_names.write().unwrap().insert(name.into());
        self
    }

    /// Reject every call as if the access token expired.
    pub fn unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, StoreCall::Create { .. }))
            .count()
    }

    pub fn object(&self, id: &str) -> Option<StoredObject> {
        self.objects.read().unwrap().get(id).cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn create_object(
        &self,
        name: &str,
        folder_id: &str,
        content: Bytes,
        mime_type: &str,
    ) -> Result<String, UploadError> {
        self.calls.write().unwrap().push(StoreCall::Create {
            name: name.to_string(),
            folder_id: folder_id.to_string(),
            size: content.len(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unauthorized {
            return Err(UploadError::Unauthorized("mock token expired".into()));
        }
        {
            let mut remaining = self.rate_limits.write().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UploadError::RateLimited("mock rate limit".into()));
            }
        }
        if self.rejected_names.read().unwrap().contains(name) {
            return Err(UploadError::Remote {
                message: format!("mock rejected {}", name),
                retryable: false,
            });
        }

        let id = format!("obj-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.objects.write().unwrap().insert(
            id.clone(),
            StoredObject {
                name: name.to_string(),
                folder_id: folder_id.to_string(),
                content,
                mime_type: mime_type.to_string(),
                public: false,
            },
        );
        {
            let mut remaining = self.lost_responses.write().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UploadError::Timeout(Duration::from_secs(120)));
            }
        }
        Ok(id)
    }

    async fn grant_public_read(&self, object_id: &str) -> Result<(), UploadError> {
        self.calls.write().unwrap().push(StoreCall::Grant {
            object_id: object_id.to_string(),
        });

        if self.unauthorized {
            return Err(UploadError::Unauthorized("mock token expired".into()));
        }

        match self.objects.write().unwrap().get_mut(object_id) {
            Some(object) => {
                object.public = true;
                Ok(())
            }
            None => Err(UploadError::Remote {
                message: format!("no such object {}", object_id),
                retryable: false,
            }),
        }
    }

    fn shareable_url(&self, object_id: &str) -> String {
        drive_client::share_url(object_id)
    }
}
