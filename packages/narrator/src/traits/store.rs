//! Remote object store trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::UploadError;

/// Remote store the artifacts are published to.
///
/// Each method performs one remote call; timeouts and retries are applied by
/// the caller. Authentication (including refresh) is the implementation's
/// concern: an [`UploadError::Unauthorized`] means no valid credentials remain.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create an object named `name` under `folder_id`. Returns the object id.
    async fn create_object(
        &self,
        name: &str,
        folder_id: &str,
        content: Bytes,
        mime_type: &str,
    ) -> Result<String, UploadError>;

    /// Make the object readable by anyone holding its link.
    ///
    /// This is not undone by anything in this crate.
    async fn grant_public_read(&self, object_id: &str) -> Result<(), UploadError>;

    /// Public link for an object.
    fn shareable_url(&self, object_id: &str) -> String;
}
