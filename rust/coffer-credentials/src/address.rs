//! Bucket address types.
//!
//! This module provides the [`Address`] type for specifying where a bucket of an
//! S3-compatible object store lives, and the URL construction rules for it.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::access::{AuthorizationError, percent_encode_path};

/// Address of a bucket in S3-compatible storage.
///
/// Combines endpoint, region, and bucket into a plain data struct that can be
/// used with any S3-compatible service (AWS S3, Cloudflare R2, MinIO, etc.).
///
/// Endpoint validation is deferred until a request URL is built, so an
/// address can be assembled from user input before it is known to be valid.
///
/// # Examples
///
/// ```
/// use coffer_credentials::Address;
///
/// // AWS S3
/// let addr = Address::new(
///     "https://s3.us-east-1.amazonaws.com",
///     "us-east-1",
///     "my-bucket",
/// );
///
/// // MinIO (local development)
/// let addr = Address::new("http://localhost:9000", "us-east-1", "my-bucket");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    /// The S3-compatible endpoint URL (e.g., "https://s3.us-east-1.amazonaws.com")
    endpoint: String,
    /// Region used in the signing scope (e.g., "us-east-1", "auto" for R2)
    region: String,
    /// Bucket name
    bucket: String,
}

impl Address {
    /// Create a new address with the given endpoint, region, and bucket.
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            bucket: bucket.into(),
        }
    }

    /// Get the endpoint URL string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Parse the endpoint into a URL.
    pub fn endpoint_url(&self) -> Result<Url, AuthorizationError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| AuthorizationError::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))?;
        if url.host_str().is_none() {
            return Err(AuthorizationError::InvalidEndpoint(format!(
                "{}: missing host",
                self.endpoint
            )));
        }
        Ok(url)
    }

    /// URL of the bucket root, used for listing.
    pub fn bucket_url(&self) -> Result<Url, AuthorizationError> {
        self.object_url("")
    }

    /// Path-style URL of an object: `https://endpoint/bucket/key`.
    ///
    /// Each `/`-separated segment of `key` is percent-encoded once, so the
    /// resulting URL path is already in SigV4 canonical form.
    pub fn object_url(&self, key: &str) -> Result<Url, AuthorizationError> {
        if self.bucket.is_empty() {
            return Err(AuthorizationError::InvalidBucket);
        }

        let mut url = self.endpoint_url()?;
        url.set_path(&format!("{}/{}", self.bucket, percent_encode_path(key)));
        Ok(url)
    }
}
