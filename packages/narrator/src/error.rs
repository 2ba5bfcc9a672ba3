//! Typed errors for the narration pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`); only the binary
//! collapses them into `anyhow::Error`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthError;
use crate::retry::Transient;

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing credentials, incomplete folder mapping, unusable config file.
    /// Fatal: the run is aborted before any group is processed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory creation failed for a reason other than "already exists"
    #[error("failed to create directory {}: {source}", path.display())]
    DirectoryProvision {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Row text could not be turned into audio
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Artifact could not be uploaded or shared
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    /// Two rows of one group map onto the same file name. `first_row` is
    /// 1-based.
    #[error("file name collision: {file_name} is already produced by row {first_row}")]
    Collision { file_name: String, first_row: usize },

    /// The remote store rejected the access token and it could not be refreshed
    #[error("authentication expired: {0}")]
    AuthExpired(String),

    /// Input table could not be read
    #[error("failed to read input {}: {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Output table could not be written
    #[error("failed to write output table {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors produced by the speech synthesis step.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Row has no text (after trimming whitespace)
    #[error("row has no text to synthesize")]
    EmptyText,

    /// Provider rejected the API key
    #[error("synthesis provider rejected credentials: {0}")]
    Unauthorized(String),

    /// Rate limit or quota exhausted
    #[error("synthesis rate limited: {0}")]
    RateLimited(String),

    /// Connection failure
    #[error("synthesis request failed: {0}")]
    Network(String),

    /// Any other provider-side failure
    #[error("synthesis provider error: {message}")]
    Provider { message: String, retryable: bool },

    /// The call did not finish within the configured timeout
    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    /// Audio could not be written to local storage
    #[error("failed to write audio to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Transient for SynthesisError {
    fn is_transient(&self) -> bool {
        match self {
            SynthesisError::RateLimited(_)
            | SynthesisError::Network(_)
            | SynthesisError::Timeout(_) => true,
            SynthesisError::Provider { retryable, .. } => *retryable,
            SynthesisError::EmptyText
            | SynthesisError::Unauthorized(_)
            | SynthesisError::Write { .. } => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        SynthesisError::Timeout(after)
    }
}

/// Errors produced by the upload step.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Local artifact could not be read back
    #[error("failed to read artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote store rejected the access token, refresh included
    #[error("remote store rejected credentials: {0}")]
    Unauthorized(String),

    /// No usable access token could be obtained
    #[error("access token unavailable: {0}")]
    Auth(#[from] AuthError),

    /// Rate limit or quota exhausted
    #[error("upload rate limited: {0}")]
    RateLimited(String),

    /// Connection failure
    #[error("upload request failed: {0}")]
    Network(String),

    /// Any other remote failure
    #[error("remote store error: {message}")]
    Remote { message: String, retryable: bool },

    /// The call did not finish within the configured timeout
    #[error("upload timed out after {0:?}")]
    Timeout(Duration),
}

impl UploadError {
    /// Later rows cannot succeed either once this is returned.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, UploadError::Unauthorized(_) | UploadError::Auth(_))
    }

    /// Transient, and resending cannot apply the call twice.
    ///
    /// A timeout leaves it unknown whether the remote side applied the call.
    pub fn is_safe_to_resend(&self) -> bool {
        self.is_transient() && !matches!(self, UploadError::Timeout(_))
    }
}

impl Transient for UploadError {
    fn is_transient(&self) -> bool {
        match self {
            UploadError::RateLimited(_) | UploadError::Network(_) | UploadError::Timeout(_) => {
                true
            }
            UploadError::Remote { retryable, .. } => *retryable,
            UploadError::Read { .. } | UploadError::Unauthorized(_) | UploadError::Auth(_) => {
                false
            }
        }
    }

    fn timed_out(after: Duration) -> Self {
        UploadError::Timeout(after)
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_transient_classification() {
        assert!(SynthesisError::RateLimited("quota".into()).is_transient());
        assert!(SynthesisError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!SynthesisError::EmptyText.is_transient());
        assert!(!SynthesisError::Unauthorized("bad key".into()).is_transient());
        assert!(SynthesisError::Provider { message: "502".into(), retryable: true }.is_transient());
    }

    #[test]
    fn test_upload_auth_expiry_is_fatal_not_transient() {
        let err = UploadError::Unauthorized("invalid credentials".into());
        assert!(err.is_auth_expired());
        assert!(!err.is_transient());

        let err = UploadError::RateLimited("userRateLimitExceeded".into());
        assert!(!err.is_auth_expired());
        assert!(err.is_transient());
    }

    #[test]
    fn test_timeout_is_transient_but_not_resent() {
        let err = UploadError::Timeout(Duration::from_secs(120));
        assert!(err.is_transient());
        assert!(!err.is_safe_to_resend());

        assert!(UploadError::Network("connection refused".into()).is_safe_to_resend());
        assert!(UploadError::RateLimited("quota".into()).is_safe_to_resend());
        assert!(!UploadError::Unauthorized("expired".into()).is_safe_to_resend());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = PipelineError::Collision {
            file_name: "Intro_1.mp3".into(),
            first_row: 2,
        };
        assert_eq!(
            err.to_string(),
            "file name collision: Intro_1.mp3 is already produced by row 2"
        );
    }
}
