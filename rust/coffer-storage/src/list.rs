//! S3 ListObjectsV2 requests.
//!
//! A single [ListObjectsV2] page of at most `max-keys` objects is requested. Continuation
//! tokens are never followed, so a truncated page is all the caller gets.
//!
//! [ListObjectsV2]: https://docs.aws.amazon.com/AmazonS3/latest/API/API_ListObjectsV2.html

use chrono::{DateTime, Utc};
use coffer_credentials::{Address, Invocation};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ServiceError;
use crate::request::Request;
use crate::StorageError;

/// Metadata for one object in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// The object key. Never empty.
    pub key: String,
    /// Object size in bytes, when the store reports it.
    pub size_bytes: Option<u64>,
    /// Last modification time, when the store reports it.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a ListObjectsV2 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResult {
    /// Objects in store order.
    pub objects: Vec<ObjectSummary>,
    /// If true, the store holds more objects than were returned.
    pub is_truncated: bool,
}

/// Root element of ListObjectsV2 XML response.
#[derive(Debug, Deserialize)]
#[serde(rename = "ListBucketResult")]
struct ListBucketResult {
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
    #[serde(rename = "Contents", default)]
    contents: Vec<Contents>,
}

/// Individual object entry in the listing.
#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Size")]
    size: Option<u64>,
    #[serde(rename = "LastModified")]
    last_modified: Option<String>,
}

impl From<Contents> for ObjectSummary {
    fn from(contents: Contents) -> Self {
        Self {
            key: contents.key,
            size_bytes: contents.size,
            last_modified: contents
                .last_modified
                .and_then(|time| DateTime::parse_from_rfc3339(&time).ok())
                .map(|time| time.with_timezone(&Utc)),
        }
    }
}

/// A ListObjectsV2 request for a single page.
#[derive(Debug, Clone)]
pub struct List {
    url: Url,
    region: String,
    expires: u64,
}

impl List {
    /// Create a list request for the bucket at `address`.
    pub fn new(address: &Address, max_keys: usize, expires: u64) -> Result<Self, StorageError> {
        let url = build_list_url(address.bucket_url()?, max_keys);

        Ok(Self {
            url,
            region: address.region().to_string(),
            expires,
        })
    }
}

impl Invocation for List {
    fn method(&self) -> &'static str {
        "GET"
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn expires(&self) -> u64 {
        self.expires
    }
}

impl Request for List {}

/// Build a list URL with query parameters.
fn build_list_url(base_url: Url, max_keys: usize) -> Url {
    let mut url = base_url;
    url.query_pairs_mut()
        .append_pair("list-type", "2")
        .append_pair("max-keys", &max_keys.to_string());
    url
}

/// Parse the S3 ListObjectsV2 XML response.
///
/// An `<Error>` document is classified like a failed response. Anything
/// without a `ListBucketResult` root is rejected.
pub(crate) fn parse_list_response(xml: &str) -> Result<ListResult, StorageError> {
    if let Ok(error) = quick_xml::de::from_str::<ServiceError>(xml) {
        return Err(error.into_storage_error(reqwest::StatusCode::OK));
    }

    // quick-xml is lenient and will parse any XML as defaults, so we need to validate.
    if !xml.contains("<ListBucketResult") {
        return Err(StorageError::Unknown(
            "unexpected XML response: missing ListBucketResult element".into(),
        ));
    }

    let result: ListBucketResult = quick_xml::de::from_str(xml)
        .map_err(|e| StorageError::Unknown(format!("failed to parse listing: {}", e)))?;

    Ok(ListResult {
        objects: result
            .contents
            .into_iter()
            .filter(|contents| !contents.key.is_empty())
            .map(ObjectSummary::from)
            .collect(),
        is_truncated: result.is_truncated,
    })
}
