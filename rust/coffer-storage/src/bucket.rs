//! Credential-scoped bucket client.

use coffer_credentials::{Address, TemporaryCredentials};

use crate::list::{List, ListResult, parse_list_response};
use crate::request::{Put, PutReceipt, Request};
use crate::StorageError;

/// A storage client scoped to one bucket and one set of credentials.
///
/// Buckets are ephemeral: the [`Gateway`](crate::Gateway) opens one per
/// operation from freshly obtained credentials, and every operation consumes
/// it. Only the underlying HTTP client outlives the call.
#[derive(Debug)]
pub struct Bucket<'a> {
    client: &'a reqwest::Client,
    credentials: &'a TemporaryCredentials,
    address: Address,
    expires: u64,
}

impl<'a> Bucket<'a> {
    /// Open a bucket client. Fails with [`StorageError::InvalidBucket`] when
    /// the address names no bucket.
    pub fn open(
        client: &'a reqwest::Client,
        credentials: &'a TemporaryCredentials,
        address: Address,
        expires: u64,
    ) -> Result<Self, StorageError> {
        if address.bucket().is_empty() {
            return Err(StorageError::InvalidBucket);
        }

        Ok(Self {
            client,
            credentials,
            address,
            expires,
        })
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        self.client
    }

    pub(crate) fn credentials(&self) -> &TemporaryCredentials {
        self.credentials
    }

    /// List up to `max_keys` objects.
    pub async fn list(self, max_keys: usize) -> Result<ListResult, StorageError> {
        let request = List::new(&self.address, max_keys, self.expires)?;
        let response = request.perform(&self).await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StorageError::from_response(status, &body));
        }

        parse_list_response(&body)
    }

    /// Write one object under `key`.
    pub async fn put(
        self,
        key: &str,
        body: impl Into<Vec<u8>>,
        content_type: &str,
    ) -> Result<PutReceipt, StorageError> {
        let request = Put::new(&self.address, key, body, content_type, self.expires)?;
        let response = request.perform(&self).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::from_response(status, &body));
        }

        let e_tag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim_matches('"').to_string());

        Ok(PutReceipt {
            key: key.to_string(),
            e_tag,
        })
    }
}
