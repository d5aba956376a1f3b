use coffer_credentials::AuthorizationError;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// S3 error codes that mean the credentials were refused.
const UNAUTHORIZED_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "TokenRefreshRequired",
];

/// S3 error codes that mean the bucket or object does not exist.
const NOT_FOUND_CODES: &[&str] = &["NoSuchBucket", "NoSuchKey"];

/// Errors surfaced by storage operations.
///
/// None of these are retried. The console shows the message as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No bucket name was given. Never reaches the network.
    #[error("bucket name is empty")]
    InvalidBucket,

    /// The configured endpoint cannot be turned into a request URL.
    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    /// The store refused the credentials.
    #[error("access denied: {0}")]
    Unauthorized(String),

    /// The bucket does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store could not be reached.
    #[error("failed to reach storage: {0}")]
    Network(String),

    /// Anything else the store reported, including responses we could not parse.
    #[error("storage request failed: {0}")]
    Unknown(String),
}

impl StorageError {
    /// Whether this failure means the credentials should be fetched again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StorageError::Unauthorized(_))
    }

    /// Classify a non-success response from the store.
    ///
    /// The `<Error>` document S3 returns is parsed for its code and message
    /// when present. Otherwise the HTTP status alone decides.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        match quick_xml::de::from_str::<ServiceError>(body) {
            Ok(error) => error.into_storage_error(status),
            Err(_) => Self::classify(status, None, status.to_string()),
        }
    }

    fn classify(status: StatusCode, code: Option<&str>, message: String) -> Self {
        let code = code.unwrap_or_default();

        if UNAUTHORIZED_CODES.contains(&code)
            || status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
        {
            StorageError::Unauthorized(message)
        } else if NOT_FOUND_CODES.contains(&code) || status == StatusCode::NOT_FOUND {
            StorageError::NotFound(message)
        } else {
            StorageError::Unknown(message)
        }
    }
}

/// S3 error response XML structure.
#[derive(Debug, Deserialize)]
#[serde(rename = "Error")]
pub(crate) struct ServiceError {
    #[serde(rename = "Code")]
    pub(crate) code: String,
    #[serde(rename = "Message")]
    pub(crate) message: Option<String>,
}

impl ServiceError {
    pub(crate) fn into_storage_error(self, status: StatusCode) -> StorageError {
        let message = match self.message {
            Some(message) if !message.is_empty() => format!("{}: {}", self.code, message),
            _ => self.code.clone(),
        };
        StorageError::classify(status, Some(&self.code), message)
    }
}

impl From<AuthorizationError> for StorageError {
    fn from(error: AuthorizationError) -> Self {
        match error {
            AuthorizationError::InvalidBucket => StorageError::InvalidBucket,
            AuthorizationError::InvalidEndpoint(endpoint) => {
                StorageError::InvalidEndpoint(endpoint)
            }
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() {
            StorageError::InvalidEndpoint(error.to_string())
        } else {
            StorageError::Network(error.to_string())
        }
    }
}
