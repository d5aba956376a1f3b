//! HTTP credential endpoint issuer.
//!
//! Fetches temporary credentials with a `GET` to a credential endpoint. The
//! endpoint answers with the container-credentials JSON document:
//!
//! ```json
//! {
//!   "AccessKeyId": "ASIA...",
//!   "SecretAccessKey": "...",
//!   "Token": "...",
//!   "Expiration": "2025-05-07T06:48:59Z",
//!   "IdentityId": "us-east-1:1234",
//!   "UserId": "user-1",
//!   "DisplayName": "user@example.com"
//! }
//! ```
//!
//! The caller's identity assertion, if any, is sent verbatim in the
//! `Authorization` header.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coffer_credentials::TemporaryCredentials;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::CredentialIssuer;
use crate::{AuthError, Identity, Session};

/// Fallback user id when the endpoint names neither a user nor an identity.
const UNKNOWN_USER: &str = "unknown";

/// Credential document returned by the endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialDocument {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    identity_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// Issuer backed by an HTTP credential endpoint.
#[derive(Debug, Clone)]
pub struct EndpointIssuer {
    url: Url,
    authorization: Option<String>,
    client: reqwest::Client,
}

impl EndpointIssuer {
    /// Create an issuer for the given endpoint URL.
    pub fn new(url: &str) -> Result<Self, AuthError> {
        let url = Url::parse(url)
            .map_err(|e| AuthError::Configuration(format!("invalid endpoint {}: {}", url, e)))?;

        Ok(Self {
            url,
            authorization: None,
            client: reqwest::Client::new(),
        })
    }

    /// Send this value as the `Authorization` header.
    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Parse a credential document into a session.
    fn parse_document(body: &str) -> Result<Session, AuthError> {
        let document: CredentialDocument =
            serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))?;

        if document.access_key_id.is_empty() || document.secret_access_key.is_empty() {
            return Err(AuthError::Malformed(
                "credential document is missing the access key pair".into(),
            ));
        }

        let mut credentials =
            TemporaryCredentials::new(document.access_key_id, document.secret_access_key);
        if let Some(token) = document.token {
            credentials = credentials.with_session_token(token);
        }
        if let Some(expiration) = document.expiration {
            credentials = credentials.with_expiry(expiration);
        }

        let user_id = document
            .user_id
            .clone()
            .or_else(|| document.identity_id.clone())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        let mut identity = Identity::new(user_id);
        if let Some(label) = document.display_name {
            identity = identity.with_display_label(label);
        }
        if let Some(identity_id) = document.identity_id {
            identity = identity.with_identity_id(identity_id);
        }

        Ok(Session::new(identity, credentials))
    }
}

#[async_trait]
impl CredentialIssuer for EndpointIssuer {
    async fn fetch_session(&self) -> Result<Session, AuthError> {
        tracing::debug!(endpoint = %self.url, "fetching temporary credentials");

        let mut request = self.client.get(self.url.clone());
        if let Some(authorization) = &self.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match status {
            status if status.is_success() => Self::parse_document(&body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AuthError::Rejected(format!("{}: {}", status, body.trim())))
            }
            status => Err(AuthError::Issuer(format!("{}: {}", status, body.trim()))),
        }
    }
}
