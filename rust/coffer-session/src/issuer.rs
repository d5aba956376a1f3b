//! Credential issuers.
//!
//! A [`CredentialIssuer`] is the external collaborator that holds a signed-in
//! identity and vends temporary credentials for it. This crate only consumes
//! issuers; sign-in flows and token refresh are the issuer's concern.
//!
//! - [`StaticIssuer`] - a fixed session, for configuration-provided keys and tests
//! - [`EndpointIssuer`] - fetches credentials from an HTTP credential endpoint

use std::sync::Arc;

use async_trait::async_trait;
use coffer_credentials::TemporaryCredentials;

use crate::{AuthError, Identity, Session};

mod endpoint;

pub use endpoint::EndpointIssuer;

/// Exchanges the current identity for temporary storage credentials.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Fetch the current session.
    ///
    /// Fails with [`AuthError`] when no identity is signed in or the exchange
    /// fails.
    async fn fetch_session(&self) -> Result<Session, AuthError>;
}

#[async_trait]
impl<T> CredentialIssuer for Arc<T>
where
    T: CredentialIssuer + ?Sized,
{
    async fn fetch_session(&self) -> Result<Session, AuthError> {
        self.as_ref().fetch_session().await
    }
}

/// Issuer that always returns the same session.
#[derive(Debug, Clone)]
pub struct StaticIssuer {
    session: Option<Session>,
}

impl StaticIssuer {
    pub fn new(identity: Identity, credentials: TemporaryCredentials) -> Self {
        Self {
            session: Some(Session::new(identity, credentials)),
        }
    }

    /// An issuer with nobody signed in.
    pub fn signed_out() -> Self {
        Self { session: None }
    }
}

#[async_trait]
impl CredentialIssuer for StaticIssuer {
    async fn fetch_session(&self) -> Result<Session, AuthError> {
        self.session.clone().ok_or(AuthError::NoIdentity)
    }
}
