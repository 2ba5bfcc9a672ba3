//! Google Drive implementation of the object store trait.

use async_trait::async_trait;
use bytes::Bytes;
use drive_client::{DriveClient, DriveError, FileMetadata, Permission};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::auth::{SecretString, TokenCache};
use crate::error::UploadError;
use crate::traits::store::ObjectStore;

/// Drive-backed object store.
///
/// A 401 triggers one token refresh through the shared [`TokenCache`]; if
/// the retried call is rejected again the error is reported as
/// [`UploadError::Unauthorized`].
pub struct DriveStore {
    client: DriveClient,
    tokens: Arc<TokenCache>,
}

impl DriveStore {
    pub fn new(client: DriveClient, tokens: Arc<TokenCache>) -> Self {
        Self { client, tokens }
    }

    async fn authorized<T, F, Fut>(&self, call: F) -> Result<T, UploadError>
    where
        F: Fn(SecretString) -> Fut,
        Fut: Future<Output = drive_client::Result<T>>,
    {
        let (generation, token) = self.tokens.current().await?;
        match call(token).await {
            Err(err) if err.is_unauthorized() => {
                warn!(error = %err, "Drive rejected access token, refreshing");
                let (_, token) = self.tokens.refresh_after(generation).await?;
                call(token).await.map_err(UploadError::from)
            }
            other => other.map_err(UploadError::from),
        }
    }
}

#[async_trait]
impl ObjectStore for DriveStore {
    async fn create_object(
        &self,
        name: &str,
        folder_id: &str,
        content: Bytes,
        mime_type: &str,
    ) -> Result<String, UploadError> {
        let metadata = FileMetadata::new(name, folder_id).with_mime_type(mime_type);
        let file = self
            .authorized(|token| {
                let metadata = &metadata;
                let content = content.clone();
                async move {
                    self.client
                        .create_file(token.expose(), metadata, content, mime_type)
                        .await
                }
            })
            .await?;
        Ok(file.id)
    }

    async fn grant_public_read(&self, object_id: &str) -> Result<(), UploadError> {
        let permission = Permission::anyone_reader();
        self.authorized(|token| {
            let permission = &permission;
            async move {
                self.client
                    .create_permission(token.expose(), object_id, permission)
                    .await
            }
        })
        .await?;
        Ok(())
    }

    fn shareable_url(&self, object_id: &str) -> String {
        drive_client::share_url(object_id)
    }
}

impl From<DriveError> for UploadError {
    fn from(err: DriveError) -> Self {
        let retryable = err.is_retryable();
        match err {
            DriveError::Unauthorized(msg) => UploadError::Unauthorized(msg),
            DriveError::RateLimited { message, .. } => UploadError::RateLimited(message),
            DriveError::Http(e) if retryable => UploadError::Network(e.to_string()),
            other => UploadError::Remote {
                message: other.to_string(),
                retryable,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthProvider, StaticTokenProvider};
    use crate::retry::Transient;
    use axum::extract::State;
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Local stand-in for the Drive API that accepts a single token.
    #[derive(Clone)]
    struct FakeDrive {
        accepted: &'static str,
        uploads: Arc<Mutex<Vec<String>>>,
        grants: Arc<Mutex<Vec<String>>>,
    }

    impl FakeDrive {
        fn accepting(token: &'static str) -> Self {
            Self {
                accepted: token,
                uploads: Arc::default(),
                grants: Arc::default(),
            }
        }

        fn uploads(&self) -> Vec<String> {
            self.uploads.lock().unwrap().clone()
        }

        fn grants(&self) -> Vec<String> {
            self.grants.lock().unwrap().clone()
        }

        fn check(
            &self,
            headers: &HeaderMap,
            seen: &Mutex<Vec<String>>,
        ) -> Result<(), (StatusCode, Json<Value>)> {
            let token = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .unwrap_or_default()
                .to_string();
            seen.lock().unwrap().push(token.clone());
            if token == self.accepted {
                Ok(())
            } else {
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": {
                            "message": "Invalid Credentials",
                            "errors": [{ "reason": "authError" }]
                        }
                    })),
                ))
            }
        }
    }

    async fn upload(State(drive): State<FakeDrive>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
        match drive.check(&headers, &drive.uploads) {
            Ok(()) => (StatusCode::OK, Json(json!({ "id": "file-1", "name": "Intro_1.mp3" }))),
            Err(rejection) => rejection,
        }
    }

    async fn grant(State(drive): State<FakeDrive>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
        match drive.check(&headers, &drive.grants) {
            Ok(()) => (StatusCode::OK, Json(json!({ "id": "anyoneWithLink" }))),
            Err(rejection) => rejection,
        }
    }

    async fn serve(drive: FakeDrive) -> DriveClient {
        let app = Router::new()
            .route("/upload/files", post(upload))
            .route("/api/files/:id/permissions", post(grant))
            .with_state(drive);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        DriveClient::new().with_base_urls(
            format!("http://{addr}/api"),
            format!("http://{addr}/upload"),
        )
    }

    /// Hands out "stale" first and `refreshed` on every refresh.
    struct RotatingProvider {
        refreshed: &'static str,
        refreshes: AtomicU32,
    }

    impl RotatingProvider {
        fn new(refreshed: &'static str) -> Arc<Self> {
            Arc::new(Self {
                refreshed,
                refreshes: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl AuthProvider for RotatingProvider {
        async fn access_token(&self) -> Result<SecretString, AuthError> {
            Ok("stale".into())
        }

        async fn refresh(&self) -> Result<SecretString, AuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(self.refreshed.into())
        }
    }

    fn audio() -> Bytes {
        Bytes::from_static(b"ID3")
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_and_call_retried() {
        let drive = FakeDrive::accepting("fresh");
        let provider = RotatingProvider::new("fresh");
        let store = DriveStore::new(
            serve(drive.clone()).await,
            Arc::new(TokenCache::new(provider.clone())),
        );

        let id = store
            .create_object("Intro_1.mp3", "folder-1", audio(), "audio/mpeg")
            .await
            .unwrap();
        assert_eq!(id, "file-1");
        assert_eq!(drive.uploads(), vec!["stale", "fresh"]);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);

        // Later calls start from the refreshed token.
        store.grant_public_read(&id).await.unwrap();
        assert_eq!(drive.grants(), vec!["fresh"]);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_token_without_refresh_is_auth_expired() {
        let drive = FakeDrive::accepting("fresh");
        let store = DriveStore::new(
            serve(drive.clone()).await,
            Arc::new(TokenCache::new(Arc::new(StaticTokenProvider::new("stale")))),
        );

        let err = store
            .create_object("Intro_1.mp3", "folder-1", audio(), "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Auth(AuthError::RefreshUnsupported)));
        assert!(err.is_auth_expired());
        assert!(!err.is_transient());
        assert_eq!(drive.uploads(), vec!["stale"]);
    }

    #[tokio::test]
    async fn test_refreshed_token_rejected_again_is_not_refreshed_twice() {
        let drive = FakeDrive::accepting("fresh");
        let provider = RotatingProvider::new("still-stale");
        let store = DriveStore::new(
            serve(drive.clone()).await,
            Arc::new(TokenCache::new(provider.clone())),
        );

        let err = store.grant_public_read("file-1").await.unwrap_err();
        assert!(matches!(err, UploadError::Unauthorized(_)));
        assert!(err.is_auth_expired());
        assert_eq!(drive.grants(), vec!["stale", "still-stale"]);
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drive_error_mapping() {
        let err: UploadError = DriveError::Unauthorized("Invalid Credentials".into()).into();
        assert!(err.is_auth_expired());

        let err: UploadError = DriveError::RateLimited {
            status: 403,
            message: "userRateLimitExceeded".into(),
        }
        .into();
        assert!(matches!(err, UploadError::RateLimited(_)));
        assert!(err.is_transient());

        let err: UploadError = DriveError::Api {
            status: 404,
            message: "File not found: folder-x".into(),
        }
        .into();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("folder-x"));
    }

    #[test]
    fn test_share_url_uses_drive_template() {
        let tokens = Arc::new(TokenCache::new(Arc::new(crate::auth::StaticTokenProvider::new(
            "token",
        ))));
        let store = DriveStore::new(DriveClient::new(), tokens);
        assert_eq!(
            store.shareable_url("abc123"),
            "https://drive.google.com/file/d/abc123/view?usp=sharing"
        );
    }
}
