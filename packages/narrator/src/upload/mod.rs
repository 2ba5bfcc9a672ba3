//! Publishing artifacts to the remote object store.
//!
//! Uploading makes every object readable by anyone holding its link. This
//! crate never revokes that permission.
//!
//! Creating an object is not idempotent. A create that timed out is not
//! retried, since the object may exist already.

pub mod drive;

pub use drive::DriveStore;

use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::UploadError;
use crate::retry::{with_retry, with_retry_if, RetryPolicy};
use crate::traits::store::ObjectStore;
use crate::types::Artifact;

pub struct RemoteUploader {
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl RemoteUploader {
    pub fn new(store: Arc<dyn ObjectStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Upload `local_path` as `remote_name` into `folder_id`, share it
    /// publicly, and return the completed artifact.
    ///
    /// Object creation and the permission grant are retried independently, so
    /// a failed grant never re-uploads the content. A timed-out create is
    /// returned as is rather than risking a duplicate object.
    pub async fn upload(
        &self,
        local_path: &Path,
        remote_name: &str,
        mime_type: &str,
        folder_id: &str,
    ) -> Result<Artifact, UploadError> {
        let content = Bytes::from(tokio::fs::read(local_path).await.map_err(|source| {
            UploadError::Read {
                path: local_path.to_path_buf(),
                source,
            }
        })?);

        let object_id = with_retry_if(
            &self.retry,
            "object create",
            UploadError::is_safe_to_resend,
            || {
                self.store
                    .create_object(remote_name, folder_id, content.clone(), mime_type)
            },
        )
        .await?;

        with_retry(&self.retry, "permission create", || {
            self.store.grant_public_read(&object_id)
        })
        .await?;

        let shareable_url = self.store.shareable_url(&object_id);
        debug!(object_id = %object_id, url = %shareable_url, "Artifact published");

        Ok(Artifact {
            local_path: local_path.to_path_buf(),
            remote_object_id: object_id,
            shareable_url,
            mime_type: mime_type.to_string(),
        })
    }
}
