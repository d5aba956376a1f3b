//! S3 request types and execution.
//!
//! This module contains the [`Put`] request and the [`Request`] trait for
//! executing presigned requests against a [`Bucket`]. The list request lives
//! with its response parsing in [`list`](crate::list).

use async_trait::async_trait;
use coffer_credentials::{Address, Checksum, Hasher, Invocation};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Bucket, StorageError};

/// Acknowledgement of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutReceipt {
    /// The key that was written.
    pub key: String,
    /// Entity tag reported by the store, without surrounding quotes.
    pub e_tag: Option<String>,
}

/// A PUT request to upload one object.
#[derive(Debug)]
pub struct Put {
    url: Url,
    region: String,
    expires: u64,
    body: Vec<u8>,
    content_type: String,
    checksum: Checksum,
}

impl Put {
    /// Create a PUT request for `key` in the bucket at `address`.
    ///
    /// The body's SHA-256 checksum is computed up front and sent as a signed
    /// `x-amz-checksum-sha256` header.
    pub fn new(
        address: &Address,
        key: &str,
        body: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
        expires: u64,
    ) -> Result<Self, StorageError> {
        let body = body.into();
        let checksum = Hasher::Sha256.checksum(&body);

        Ok(Self {
            url: address.object_url(key)?,
            region: address.region().to_string(),
            expires,
            body,
            content_type: content_type.into(),
            checksum,
        })
    }
}

impl Invocation for Put {
    fn method(&self) -> &'static str {
        "PUT"
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn checksum(&self) -> Option<&Checksum> {
        Some(&self.checksum)
    }

    fn expires(&self) -> u64 {
        self.expires
    }
}

impl Request for Put {
    fn body(&self) -> Option<&[u8]> {
        Some(&self.body)
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![("content-type".into(), self.content_type.clone())]
    }
}

/// Executable S3 request with an optional body.
///
/// This trait extends [`Invocation`] with the payload and any headers that
/// travel unsigned. [`Invocation`] only carries what the signer needs.
#[async_trait]
pub trait Request: Invocation + Sync + Sized {
    /// The request body, if any.
    fn body(&self) -> Option<&[u8]> {
        None
    }

    /// Extra headers sent with the request but not covered by the signature.
    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Perform this request with the bucket's credentials and HTTP client.
    async fn perform(&self, bucket: &Bucket<'_>) -> Result<reqwest::Response, StorageError> {
        let authorized = bucket.credentials().authorize(self)?;

        tracing::debug!(
            method = self.method(),
            url = %self.url(),
            access_key = %bucket.credentials().masked_access_key(),
            "sending presigned request"
        );

        let mut builder = match self.method() {
            "GET" => bucket.client().get(authorized.url),
            "PUT" => bucket.client().put(authorized.url),
            method => {
                let method = reqwest::Method::from_bytes(method.as_bytes())
                    .map_err(|e| StorageError::Unknown(e.to_string()))?;
                bucket.client().request(method, authorized.url)
            }
        };

        for (key, value) in authorized.headers.into_iter().chain(self.headers()) {
            builder = builder.header(key, value);
        }

        if let Some(body) = self.body() {
            builder = builder.body(body.to_vec());
        }

        Ok(builder.send().await?)
    }
}
