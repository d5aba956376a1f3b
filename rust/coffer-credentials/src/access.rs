//! AWS S3 Signature Version 4 signing implementation.
//!
//! This module provides presigned URL generation for S3-compatible storage
//! services using [query string authentication]. A request only needs to
//! describe itself through [`Invocation`]; [`TemporaryCredentials::authorize`]
//! turns it into an [`Authorization`] carrying the signed URL and the headers
//! that must accompany it.
//!
//! [query string authentication]: https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use thiserror::Error;
use url::Url;

use crate::{Checksum, TemporaryCredentials};

/// Default URL expiration: 1 hour.
pub const DEFAULT_EXPIRES: u64 = 3600;

/// Request metadata required for authorization.
///
/// This trait captures all information needed to sign a request:
/// - HTTP method, URL, checksum (request-specific)
/// - Region, service, expires, time (signing parameters)
pub trait Invocation {
    /// The HTTP method for this request.
    fn method(&self) -> &'static str;

    /// The URL for this request. The path must already be percent-encoded.
    fn url(&self) -> &Url;

    /// The region for signing (e.g., "us-east-1", "auto").
    fn region(&self) -> &str;

    /// The checksum of the body, if any.
    fn checksum(&self) -> Option<&Checksum> {
        None
    }

    /// The service name for signing. Defaults to "s3".
    fn service(&self) -> &str {
        "s3"
    }

    /// URL signature expiration in seconds.
    fn expires(&self) -> u64 {
        DEFAULT_EXPIRES
    }

    /// The timestamp for signing. Defaults to current time.
    fn time(&self) -> DateTime<Utc> {
        current_time()
    }
}

/// An authorization of the request
#[derive(Debug)]
pub struct Authorization {
    /// The presigned URL
    pub url: Url,
    /// Headers that must be included in the HTTP request
    pub headers: Vec<(String, String)>,
}

/// Errors that can occur while building or signing a request.
#[derive(Error, Debug)]
pub enum AuthorizationError {
    /// The endpoint URL is invalid (e.g., missing host).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// No bucket name was given.
    #[error("bucket name is empty")]
    InvalidBucket,
}

impl TemporaryCredentials {
    /// Authorize a request with an AWS SigV4 presigned URL.
    ///
    /// Derives the signing key on demand using the request's time. When the
    /// credentials carry a session token it is included in the signed query
    /// as `X-Amz-Security-Token`.
    pub fn authorize<I: Invocation>(
        &self,
        request: &I,
    ) -> Result<Authorization, AuthorizationError> {
        let time = request.time();
        let timestamp = time.format("%Y%m%dT%H%M%SZ").to_string();
        let date = &timestamp[0..8];

        let region = request.region();
        let service = request.service();
        let expires = request.expires();

        let key = SigningKey::derive(self.secret_access_key(), date, region, service);
        let scope = format!("{}/{}/{}/aws4_request", date, region, service);

        let url = request.url();
        let headers = required_headers(request)?;

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let mut query_params: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()),
            ("X-Amz-Content-Sha256".into(), "UNSIGNED-PAYLOAD".into()),
            (
                "X-Amz-Credential".into(),
                format!("{}/{}", self.access_key_id(), scope),
            ),
            ("X-Amz-Date".into(), timestamp.clone()),
            ("X-Amz-Expires".into(), expires.to_string()),
        ];

        if let Some(token) = self.session_token() {
            query_params.push(("X-Amz-Security-Token".into(), token.to_string()));
        }

        query_params.push(("X-Amz-SignedHeaders".into(), signed_headers.clone()));

        // Keep the request's own parameters (e.g. list-type=2, max-keys=10)
        for (key, value) in url.query_pairs() {
            query_params.push((key.into_owned(), value.into_owned()));
        }

        // SigV4 requires parameters sorted by name
        query_params.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_query: String = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v.trim()))
            .collect::<Vec<_>>()
            .join("\n");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n\n{}\nUNSIGNED-PAYLOAD",
            request.method(),
            url.path(),
            canonical_query,
            canonical_headers,
            signed_headers
        );

        let digest = Sha256::digest(canonical_request.as_bytes());
        let payload = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            timestamp,
            scope,
            hex_encode(&digest)
        );

        let signature = key.sign(payload.as_bytes());

        let mut url = url.clone();
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in &query_params {
                query.append_pair(k, v);
            }
            query.append_pair("X-Amz-Signature", &signature.to_string());
        }

        Ok(Authorization { url, headers })
    }
}

/// Headers every request must carry, sorted by name: `host` plus the
/// checksum header when the request has a body checksum.
fn required_headers<I: Invocation>(
    request: &I,
) -> Result<Vec<(String, String)>, AuthorizationError> {
    let url = request.url();
    // host_str() has no port, so add it back for non-standard ports
    let hostname = url
        .host_str()
        .ok_or_else(|| AuthorizationError::InvalidEndpoint("URL missing host".into()))?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    };

    let mut headers = vec![("host".to_string(), host)];
    if let Some(checksum) = request.checksum() {
        headers.push((checksum.header_name(), checksum.to_string()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(headers)
}

/// AWS SigV4 signing key derived from credentials.
///
/// The key is derived through an HMAC chain:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`
#[derive(Clone)]
struct SigningKey(Vec<u8>);

impl SigningKey {
    fn derive(secret: &str, date: &str, region: &str, service: &str) -> Self {
        let secret = format!("AWS4{}", secret);
        let k_date = Self::hmac(secret.as_bytes(), date.as_bytes());
        let k_region = Self::hmac(&k_date, region.as_bytes());
        let k_service = Self::hmac(&k_region, service.as_bytes());
        Self(Self::hmac(&k_service, b"aws4_request"))
    }

    fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any size");
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }

    fn sign(&self, data: &[u8]) -> Signature {
        Signature(Self::hmac(&self.0, data))
    }
}

/// HMAC-SHA256 signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature(Vec<u8>);

impl std::fmt::Display for Signature {
    /// Displays hex encoded representation of the signature
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex_encode(&self.0))
    }
}

/// Get the current time as a UTC datetime.
pub fn current_time() -> DateTime<Utc> {
    Utc::now()
}

/// Encode bytes as lowercase hexadecimal string.
fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(s, "{:02x}", byte);
    }
    s
}

/// Percent-encode a string according to RFC 3986.
///
/// Unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) are not encoded.
/// All other bytes are encoded as `%XX` where XX is the uppercase hex value.
pub(crate) fn percent_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                let _ = write!(result, "%{:02X}", byte);
            }
        }
    }
    result
}

/// Percent-encode a URL path, preserving forward slashes.
pub(crate) fn percent_encode_path(path: &str) -> String {
    percent_encode(path).replace("%2F", "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Hasher;
    use chrono::TimeZone;

    fn test_credentials() -> TemporaryCredentials {
        TemporaryCredentials::new("my-id", "top secret")
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 7, 5, 48, 59).unwrap()
    }

    const TEST_REGION: &str = "auto";

    fn s3_url(path: &str) -> Url {
        Url::parse(&format!("https://pale.s3.auto.amazonaws.com/{}", path)).unwrap()
    }

    struct TestRequest {
        method: &'static str,
        url: Url,
        checksum: Option<Checksum>,
        expires: u64,
    }

    impl TestRequest {
        fn put(url: Url, body: &[u8]) -> Self {
            Self {
                method: "PUT",
                url,
                checksum: Some(Hasher::Sha256.checksum(body)),
                expires: DEFAULT_EXPIRES,
            }
        }

        fn get(url: Url) -> Self {
            Self {
                method: "GET",
                url,
                checksum: None,
                expires: DEFAULT_EXPIRES,
            }
        }

        fn with_expires(mut self, expires: u64) -> Self {
            self.expires = expires;
            self
        }
    }

    impl Invocation for TestRequest {
        fn method(&self) -> &'static str {
            self.method
        }

        fn url(&self) -> &Url {
            &self.url
        }

        fn region(&self) -> &str {
            TEST_REGION
        }

        fn checksum(&self) -> Option<&Checksum> {
            self.checksum.as_ref()
        }

        fn expires(&self) -> u64 {
            self.expires
        }

        fn time(&self) -> DateTime<Utc> {
            test_time()
        }
    }

    fn signature_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(k, _)| k == "X-Amz-Signature")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn it_authorizes_put_request() {
        let request = TestRequest::put(s3_url("file/path"), b"test body");
        let auth = test_credentials().authorize(&request).unwrap();

        assert!(
            auth.url
                .as_str()
                .contains("X-Amz-Algorithm=AWS4-HMAC-SHA256")
        );
        assert!(auth.url.as_str().contains("X-Amz-Signature="));
        assert!(
            auth.headers
                .iter()
                .any(|(k, _)| k == "x-amz-checksum-sha256")
        );
        assert!(auth.url.as_str().contains("x-amz-checksum-sha256"));
    }

    #[test]
    fn it_keeps_request_query_parameters() {
        let mut url = s3_url("");
        url.query_pairs_mut()
            .append_pair("list-type", "2")
            .append_pair("max-keys", "10");
        let auth = test_credentials()
            .authorize(&TestRequest::get(url))
            .unwrap();

        let pairs: Vec<(String, String)> = auth
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("list-type".into(), "2".into())));
        assert!(pairs.contains(&("max-keys".into(), "10".into())));
    }

    #[test]
    fn it_includes_host_with_port() {
        let url = Url::parse("http://127.0.0.1:9000/bucket/key").unwrap();
        let auth = test_credentials()
            .authorize(&TestRequest::get(url))
            .unwrap();

        assert_eq!(
            auth.headers,
            vec![("host".to_string(), "127.0.0.1:9000".to_string())]
        );
    }

    #[test]
    fn it_omits_security_token_without_session_token() {
        let auth = test_credentials()
            .authorize(&TestRequest::get(s3_url("key")))
            .unwrap();

        assert!(!auth.url.as_str().contains("X-Amz-Security-Token"));
    }

    #[test]
    fn it_signs_security_token_when_present() {
        let plain = test_credentials()
            .authorize(&TestRequest::get(s3_url("key")))
            .unwrap();
        let scoped = test_credentials()
            .with_session_token("session/token+value")
            .authorize(&TestRequest::get(s3_url("key")))
            .unwrap();

        let token = scoped
            .url
            .query_pairs()
            .find(|(k, _)| k == "X-Amz-Security-Token")
            .map(|(_, v)| v.into_owned());
        assert_eq!(token.as_deref(), Some("session/token+value"));
        assert_ne!(signature_of(&plain.url), signature_of(&scoped.url));
    }

    #[test]
    fn it_hex_encodes_bytes() {
        assert_eq!(hex_encode(&[0x01, 0x02, 0x03, 0x0A, 0x0F]), "0102030a0f");
    }

    #[test]
    fn it_percent_encodes_strings() {
        assert_eq!(percent_encode("abc123"), "abc123");
        assert_eq!(percent_encode("a b+c"), "a%20b%2Bc");
        assert_eq!(percent_encode("test/path"), "test%2Fpath");
        assert_eq!(percent_encode_path("test/a b"), "test/a%20b");
    }

    #[test]
    fn it_gets_reasonable_current_time() {
        let year: u32 = current_time().format("%Y").to_string().parse().unwrap();
        assert!(year >= 2024, "Year out of range: {}", year);
    }

    /// Fixed inputs must always produce the same signature.
    #[test]
    fn it_generates_stable_signature() {
        let request = TestRequest::put(s3_url("file/path"), b"test body").with_expires(86400);
        let auth = test_credentials().authorize(&request).unwrap();

        const EXPECTED_SIGNATURE: &str =
            "04b33a973b320c6aa27ab8e2f1821a563e80a032f6089b992070310de196bdff";

        assert_eq!(signature_of(&auth.url), EXPECTED_SIGNATURE);
    }
}
