use serde::{Deserialize, Serialize};

/// Metadata part of a multipart file upload.
#[derive(Debug, Clone, Serialize)]
pub struct FileMetadata {
    pub name: String,
    pub parents: Vec<String>,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: vec![parent_id.into()],
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// A file resource as returned with `fields=id,name`.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: Option<String>,
}

/// Body of a permission create call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub role: String,
    #[serde(rename = "type")]
    pub grantee_type: String,
}

impl Permission {
    /// Read-only access for anyone holding the link.
    pub fn anyone_reader() -> Self {
        Self {
            role: "reader".to_string(),
            grantee_type: "anyone".to_string(),
        }
    }
}

/// Permission resource returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionResource {
    pub id: String,
}

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub reason: String,
}
