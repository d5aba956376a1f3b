//! The console controller.
//!
//! Holds what the user sees: the bucket name they typed and the status of
//! the identity fetch, the last listing and the last upload. Operations take
//! `&self` and may overlap. Each writes its own status when it completes, so
//! the last one to finish wins.

use std::sync::Arc;

use chrono::Utc;
use coffer_credentials::TemporaryCredentials;
use coffer_session::{Session, SessionProvider};
use coffer_storage::{
    DEFAULT_MAX_KEYS, Gateway, ObjectSummary, PutReceipt, StorageError, test_object_body,
    test_object_key,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::OperationStatus;

/// Content type of the connectivity test object.
const TEST_OBJECT_CONTENT_TYPE: &str = "text/plain";

/// Label shown when the issuer gives no human-readable name.
const UNKNOWN_LABEL: &str = "unknown";

/// What the console shows about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityView {
    pub user_id: String,
    /// The display label, or `"unknown"`.
    pub display_label: String,
    pub identity_id: Option<String>,
    /// First characters of the access key, e.g. `ASIAXAMPLE...`.
    pub masked_access_key: String,
}

impl From<&Session> for IdentityView {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.identity.user_id().to_string(),
            display_label: session
                .identity
                .display_label()
                .unwrap_or(UNKNOWN_LABEL)
                .to_string(),
            identity_id: session.identity.identity_id().map(str::to_string),
            masked_access_key: session.credentials.masked_access_key(),
        }
    }
}

/// A point-in-time copy of the console state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleState {
    pub bucket: String,
    pub identity: OperationStatus<IdentityView>,
    pub listing: OperationStatus<Vec<ObjectSummary>>,
    pub upload: OperationStatus<PutReceipt>,
}

impl ConsoleState {
    /// Whether any operation ended in failure.
    pub fn has_failure(&self) -> bool {
        self.identity.error().is_some()
            || self.listing.error().is_some()
            || self.upload.error().is_some()
    }
}

/// Headless controller behind the `coffer` CLI.
pub struct Console {
    provider: Arc<SessionProvider>,
    gateway: Gateway,
    max_keys: usize,
    state: Mutex<ConsoleState>,
}

impl Console {
    pub fn new(provider: Arc<SessionProvider>, gateway: Gateway) -> Self {
        Self {
            provider,
            gateway,
            max_keys: DEFAULT_MAX_KEYS,
            state: Mutex::new(ConsoleState::default()),
        }
    }

    /// Set how many objects a listing shows.
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Set the bucket to operate on. Surrounding whitespace is dropped.
    pub fn set_bucket(&self, bucket: &str) {
        self.state.lock().bucket = bucket.trim().to_string();
    }

    pub fn bucket(&self) -> String {
        self.state.lock().bucket.clone()
    }

    /// A copy of the current state for rendering.
    pub fn snapshot(&self) -> ConsoleState {
        self.state.lock().clone()
    }

    /// Render the current state as plain text.
    pub fn render(&self) -> String {
        self.snapshot().render()
    }

    /// Fetch the session and, when a bucket is set, list it.
    ///
    /// Used for the initial load and for retrying after a failure. A
    /// credential failure marks the identity failed and leaves the listing
    /// as it was.
    pub async fn load(&self) {
        let Some(session) = self.fetch_identity().await else {
            return;
        };

        let bucket = self.bucket();
        if !bucket.is_empty() {
            self.list_with(&session.credentials, &bucket).await;
        }
    }

    /// Fetch the session and publish the identity only.
    pub async fn load_identity(&self) {
        self.fetch_identity().await;
    }

    async fn fetch_identity(&self) -> Option<Session> {
        self.state.lock().identity = OperationStatus::Loading;

        let session = match self.provider.session().await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!(%error, "failed to load identity");
                self.state.lock().identity = OperationStatus::Failed(error.to_string());
                return None;
            }
        };

        let view = IdentityView::from(&session);
        tracing::info!(
            user = %view.user_id,
            access_key = %view.masked_access_key,
            "identity loaded"
        );
        self.state.lock().identity = OperationStatus::Succeeded(view);

        Some(session)
    }

    /// List the current bucket. Does nothing when no bucket is set.
    pub async fn list(&self) {
        let bucket = self.bucket();
        if bucket.is_empty() {
            return;
        }

        self.state.lock().listing = OperationStatus::Loading;

        match self.provider.get_credentials().await {
            Ok(credentials) => self.list_with(&credentials, &bucket).await,
            Err(error) => {
                tracing::warn!(%error, "failed to obtain credentials for listing");
                self.state.lock().listing = OperationStatus::Failed(error.to_string());
            }
        }
    }

    /// Write a timestamped test object, then list the bucket again.
    ///
    /// Does nothing when no bucket is set.
    pub async fn upload_test_object(&self) {
        let bucket = self.bucket();
        if bucket.is_empty() {
            return;
        }

        self.state.lock().upload = OperationStatus::Loading;

        let credentials = match self.provider.get_credentials().await {
            Ok(credentials) => credentials,
            Err(error) => {
                tracing::warn!(%error, "failed to obtain credentials for upload");
                self.state.lock().upload = OperationStatus::Failed(error.to_string());
                return;
            }
        };

        let now = Utc::now();
        let key = test_object_key(now);
        let result = self
            .gateway
            .put_object(
                &credentials,
                &bucket,
                &key,
                test_object_body(now),
                TEST_OBJECT_CONTENT_TYPE,
            )
            .await;

        match result {
            Ok(receipt) => {
                tracing::info!(bucket = %bucket, key = %receipt.key, "uploaded test object");
                self.state.lock().upload = OperationStatus::Succeeded(receipt);
                self.list_with(&credentials, &bucket).await;
            }
            Err(error) => {
                self.report_storage_error(&error);
                tracing::warn!(%error, bucket = %bucket, "upload failed");
                self.state.lock().upload = OperationStatus::Failed(error.to_string());
            }
        }
    }

    /// Drop cached credentials and load again.
    pub async fn refresh_identity(&self) {
        self.provider.invalidate();
        self.load().await;
    }

    /// Sign out and forget everything shown. The bucket name is kept.
    pub fn sign_out(&self) {
        self.provider.sign_out();

        let mut state = self.state.lock();
        state.identity = OperationStatus::Idle;
        state.listing = OperationStatus::Idle;
        state.upload = OperationStatus::Idle;
    }

    /// Resume after a sign-out and load again.
    pub async fn sign_in(&self) {
        self.provider.sign_in();
        self.load().await;
    }

    async fn list_with(&self, credentials: &TemporaryCredentials, bucket: &str) {
        self.state.lock().listing = OperationStatus::Loading;

        let result = self
            .gateway
            .list_objects(credentials, bucket, self.max_keys)
            .await;

        match &result {
            Ok(objects) => {
                tracing::info!(bucket = %bucket, count = objects.len(), "listed bucket")
            }
            Err(error) => {
                self.report_storage_error(error);
                tracing::warn!(%error, bucket = %bucket, "listing failed");
            }
        }

        self.state.lock().listing = result.into();
    }

    fn report_storage_error(&self, error: &StorageError) {
        // Refused credentials should not be served from cache again
        if error.is_unauthorized() {
            self.provider.invalidate();
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("provider", &self.provider)
            .field("max_keys", &self.max_keys)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
