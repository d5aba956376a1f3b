//! Temporary credentials vended by a credential issuer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Number of access key characters shown by [`TemporaryCredentials::masked_access_key`].
const MASKED_PREFIX_LEN: usize = 10;

/// Short-lived credentials authorizing storage requests.
///
/// These are owned by the issuer that vended them: they are fetched fresh
/// before storage operations, never persisted, and valid only until the
/// issuer-defined `expiry`. The `Debug` implementation redacts the secret and
/// the session token so credentials can appear in logs safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
}

impl TemporaryCredentials {
    /// Create credentials from an access key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiry: None,
        }
    }

    /// Attach the session token that accompanies temporary key pairs.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Attach the issuer-defined expiry.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Get the expiry, if the issuer provided one.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Whether these credentials are past `expiry - skew` at `now`.
    ///
    /// Credentials without an expiry never report as expired.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.expiry {
            Some(expiry) => now >= expiry - skew,
            None => false,
        }
    }

    /// The access key reduced to a displayable prefix, e.g. `AKIAIOSFOD...`.
    pub fn masked_access_key(&self) -> String {
        let prefix: String = self.access_key_id.chars().take(MASKED_PREFIX_LEN).collect();
        format!("{}...", prefix)
    }
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.masked_access_key())
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}
