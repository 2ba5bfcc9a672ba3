use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriveError>;

#[derive(Debug, Error)]
pub enum DriveError {
    /// Access token missing, expired or revoked (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Per-user or per-project quota exhausted (429, or 403 with a rate-limit reason).
    #[error("rate limited ({status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Drive API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DriveError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DriveError::Unauthorized(_))
    }

    /// Network failures, rate limits and server-side errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            DriveError::RateLimited { .. } => true,
            DriveError::Api { status, .. } => *status >= 500,
            DriveError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            DriveError::Unauthorized(_) | DriveError::Encode(_) => false,
        }
    }
}
