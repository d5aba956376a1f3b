//! The session provider.

use chrono::{Duration, Utc};
use coffer_credentials::TemporaryCredentials;
use parking_lot::Mutex;

use crate::{AuthError, CredentialIssuer, Identity, Session};

/// How long the provider may reuse a fetched session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Ask the issuer on every call.
    #[default]
    Never,
    /// Reuse the session until its credentials are within `skew` of expiry.
    ///
    /// Credentials without an expiry are reused until [`SessionProvider::invalidate`].
    UntilExpiry { skew: Duration },
}

#[derive(Debug)]
struct ProviderState {
    signed_in: bool,
    cached: Option<Session>,
}

/// Hands out temporary credentials for the signed-in identity.
///
/// All storage operations obtain their credentials here. Any [`AuthError`]
/// reported by the issuer drops the cached session so the next call asks the
/// issuer again.
pub struct SessionProvider {
    issuer: Box<dyn CredentialIssuer>,
    policy: CachePolicy,
    state: Mutex<ProviderState>,
}

impl SessionProvider {
    /// Create a provider that re-fetches on every call.
    pub fn new<I>(issuer: I) -> Self
    where
        I: CredentialIssuer + 'static,
    {
        Self {
            issuer: Box::new(issuer),
            policy: CachePolicy::default(),
            state: Mutex::new(ProviderState {
                signed_in: true,
                cached: None,
            }),
        }
    }

    /// Set the cache policy.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.policy
    }

    /// Temporary credentials for the current identity.
    pub async fn get_credentials(&self) -> Result<TemporaryCredentials, AuthError> {
        Ok(self.session().await?.credentials)
    }

    /// The identity of the current session.
    pub async fn identity(&self) -> Result<Identity, AuthError> {
        Ok(self.session().await?.identity)
    }

    /// The current session, from cache when the policy allows it.
    pub async fn session(&self) -> Result<Session, AuthError> {
        if let Some(session) = self.cached()? {
            tracing::debug!(
                access_key = %session.credentials.masked_access_key(),
                "reusing cached session"
            );
            return Ok(session);
        }

        match self.issuer.fetch_session().await {
            Ok(session) => {
                let mut state = self.state.lock();
                if !state.signed_in {
                    // Signed out while the fetch was in flight
                    return Err(AuthError::NoIdentity);
                }
                if let CachePolicy::UntilExpiry { .. } = self.policy {
                    state.cached = Some(session.clone());
                }
                tracing::debug!(
                    user = %session.identity.user_id(),
                    access_key = %session.credentials.masked_access_key(),
                    "fetched session"
                );
                Ok(session)
            }
            Err(error) => {
                self.invalidate();
                tracing::warn!(%error, "credential fetch failed");
                Err(error)
            }
        }
    }

    /// Drop any cached session so the next call asks the issuer.
    pub fn invalidate(&self) {
        self.state.lock().cached = None;
    }

    /// Destroy the session. Later calls fail with [`AuthError::NoIdentity`]
    /// until [`SessionProvider::sign_in`].
    pub fn sign_out(&self) {
        let mut state = self.state.lock();
        state.signed_in = false;
        state.cached = None;
        tracing::info!("signed out");
    }

    /// Resume asking the issuer for sessions after a sign-out.
    pub fn sign_in(&self) {
        self.state.lock().signed_in = true;
    }

    fn cached(&self) -> Result<Option<Session>, AuthError> {
        let mut state = self.state.lock();
        if !state.signed_in {
            return Err(AuthError::NoIdentity);
        }

        let CachePolicy::UntilExpiry { skew } = self.policy else {
            return Ok(None);
        };

        match &state.cached {
            Some(session) if !session.credentials.is_expired(Utc::now(), skew) => {
                Ok(Some(session.clone()))
            }
            Some(_) => {
                tracing::debug!("cached credentials expired");
                state.cached = None;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("policy", &self.policy)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}
