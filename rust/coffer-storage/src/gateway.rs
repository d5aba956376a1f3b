use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use coffer_credentials::{Address, DEFAULT_EXPIRES, TemporaryCredentials};

use crate::{Bucket, ObjectSummary, PutReceipt, StorageError};

/// Number of objects requested by a listing unless told otherwise.
pub const DEFAULT_MAX_KEYS: usize = 10;

/// Default object store endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://s3.us-east-1.amazonaws.com";

/// Default signing region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where the object store lives and how requests are signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Object store endpoint URL, without the bucket.
    pub endpoint: String,
    /// Signing region.
    pub region: String,
    /// Presigned URL lifetime in seconds.
    pub expires: u64,
    /// Per-request timeout. `None` leaves it to the HTTP client.
    pub timeout: Option<Duration>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            region: DEFAULT_REGION.to_string(),
            expires: DEFAULT_EXPIRES,
            timeout: None,
        }
    }
}

/// The storage gateway.
///
/// Holds no credentials of its own. Every call receives the credentials to
/// use, opens a [`Bucket`] scoped to them, and drops it when done.
#[derive(Debug, Clone)]
pub struct Gateway {
    settings: GatewaySettings,
    client: reqwest::Client,
}

impl Gateway {
    /// Create a gateway with its own HTTP client.
    pub fn new(settings: GatewaySettings) -> Result<Self, StorageError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StorageError::InvalidEndpoint(e.to_string()))?;

        Ok(Self::with_client(settings, client))
    }

    /// Create a gateway sharing an existing HTTP client.
    pub fn with_client(settings: GatewaySettings, client: reqwest::Client) -> Self {
        Self { settings, client }
    }

    /// Open an ephemeral bucket client for one operation.
    fn open<'a>(
        &'a self,
        credentials: &'a TemporaryCredentials,
        bucket: &str,
    ) -> Result<Bucket<'a>, StorageError> {
        let address = Address::new(&self.settings.endpoint, &self.settings.region, bucket);
        Bucket::open(&self.client, credentials, address, self.settings.expires)
    }

    /// List up to `max_keys` objects in `bucket`.
    ///
    /// Only the first page is fetched. When the store has more objects the
    /// result is silently truncated to `max_keys`.
    pub async fn list_objects(
        &self,
        credentials: &TemporaryCredentials,
        bucket: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let result = self.open(credentials, bucket)?.list(max_keys).await?;

        if result.is_truncated {
            tracing::debug!(bucket, max_keys, "listing truncated");
        }

        let mut objects = result.objects;
        // Stores may return more than asked for
        objects.truncate(max_keys);

        tracing::debug!(bucket, count = objects.len(), "listed objects");
        Ok(objects)
    }

    /// Write `body` to `key` in `bucket`, replacing any existing object.
    pub async fn put_object(
        &self,
        credentials: &TemporaryCredentials,
        bucket: &str,
        key: &str,
        body: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> Result<PutReceipt, StorageError> {
        let receipt = self
            .open(credentials, bucket)?
            .put(key, body, content_type)
            .await?;

        tracing::debug!(bucket, key, e_tag = ?receipt.e_tag, "wrote object");
        Ok(receipt)
    }
}

/// Key for a connectivity test object written at `now`.
pub fn test_object_key(now: DateTime<Utc>) -> String {
    format!("test-{}.txt", now.timestamp_millis())
}

/// Body for a connectivity test object written at `now`.
pub fn test_object_body(now: DateTime<Utc>) -> String {
    format!(
        "Test file - {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
