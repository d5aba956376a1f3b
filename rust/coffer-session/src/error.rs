use thiserror::Error;

/// Failures obtaining credentials from the issuer.
///
/// Any of these blocks storage operations until the session is fetched
/// successfully again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// There is no signed-in identity.
    #[error("no authenticated identity; sign in first")]
    NoIdentity,

    /// The issuer refused the identity assertion (expired or revoked session).
    #[error("credential issuer rejected the session: {0}")]
    Rejected(String),

    /// The issuer could not be reached.
    #[error("failed to reach credential issuer: {0}")]
    Network(String),

    /// The issuer returned an unexpected failure.
    #[error("credential issuer failed: {0}")]
    Issuer(String),

    /// The issuer response could not be understood.
    #[error("malformed credential response: {0}")]
    Malformed(String),

    /// The issuer is misconfigured.
    #[error("invalid credential issuer configuration: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            AuthError::Malformed(error.to_string())
        } else {
            AuthError::Network(error.to_string())
        }
    }
}
