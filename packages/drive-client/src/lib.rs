//! Pure Google Drive v3 REST API client.
//!
//! A minimal client for the Drive API. Supports multipart file creation,
//! permission grants and building public share links.
//!
//! The client does not own credentials: every call takes the OAuth access
//! token to use, so callers can refresh it between calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use drive_client::{DriveClient, FileMetadata, Permission};
//!
//! let client = DriveClient::new();
//!
//! let metadata = FileMetadata::new("intro.mp3", folder_id);
//! let file = client.create_file(&token, &metadata, bytes, "audio/mpeg").await?;
//! client.create_permission(&token, &file.id, &Permission::anyone_reader()).await?;
//! println!("{}", drive_client::share_url(&file.id));
//! ```

pub mod error;
pub mod types;

pub use error::{DriveError, Result};
pub use types::{DriveFile, FileMetadata, Permission, PermissionResource};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::Duration;
use types::ErrorEnvelope;

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Host serving public file links.
pub const SHARE_HOST: &str = "drive.google.com";

/// Canonical public link for a file id.
pub fn share_url(file_id: &str) -> String {
    format!("https://{}/file/d/{}/view?usp=sharing", SHARE_HOST, file_id)
}

#[derive(Clone)]
pub struct DriveClient {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
        }
    }

    /// Apply a per-request timeout to every call made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Point the client at a different host (proxies, test servers).
    pub fn with_base_urls(mut self, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.upload_base = upload_base.into();
        self
    }

    /// Upload `content` as a new file described by `metadata`.
    pub async fn create_file(
        &self,
        access_token: &str,
        metadata: &FileMetadata,
        content: Bytes,
        mime_type: &str,
    ) -> Result<DriveFile> {
        let boundary = format!("narrator-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_related_body(&boundary, metadata, &content, mime_type)?;

        let url = format!("{}/files?uploadType=multipart&fields=id,name", self.upload_base);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await?;

        let file: DriveFile = parse_response(resp).await?;
        tracing::debug!(file_id = %file.id, name = %metadata.name, "Drive file created");
        Ok(file)
    }

    /// Grant `permission` on an existing file.
    pub async fn create_permission(
        &self,
        access_token: &str,
        file_id: &str,
        permission: &Permission,
    ) -> Result<PermissionResource> {
        let url = format!("{}/files/{}/permissions?fields=id", self.api_base, file_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(permission)
            .send()
            .await?;

        let created: PermissionResource = parse_response(resp).await?;
        tracing::debug!(file_id, role = %permission.role, grantee = %permission.grantee_type, "Drive permission granted");
        Ok(created)
    }
}

async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_failure(status.as_u16(), &body));
    }
    Ok(resp.json().await?)
}

/// Map a failed response onto a typed error.
///
/// Drive reports quota exhaustion as 403 with a `*RateLimitExceeded` reason,
/// so the body has to be inspected as well as the status.
fn classify_failure(status: u16, body: &str) -> DriveError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());
    let rate_limited_reason = envelope
        .map(|e| {
            e.error
                .errors
                .iter()
                .any(|d| d.reason.ends_with("ateLimitExceeded"))
        })
        .unwrap_or(false);

    match status {
        401 => DriveError::Unauthorized(message),
        429 => DriveError::RateLimited { status, message },
        403 if rate_limited_reason => DriveError::RateLimited { status, message },
        _ => DriveError::Api { status, message },
    }
}

fn multipart_related_body(
    boundary: &str,
    metadata: &FileMetadata,
    content: &[u8],
    mime_type: &str,
) -> Result<Vec<u8>> {
    let metadata_json = serde_json::to_string(metadata)?;

    let mut body = Vec::with_capacity(content.len() + metadata_json.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_json.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    Ok(body)
}
