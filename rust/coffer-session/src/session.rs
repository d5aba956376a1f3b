use coffer_credentials::TemporaryCredentials;

use crate::Identity;

/// An identity together with the temporary credentials issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Who is signed in.
    pub identity: Identity,
    /// What they may use to talk to storage right now.
    pub credentials: TemporaryCredentials,
}

impl Session {
    pub fn new(identity: Identity, credentials: TemporaryCredentials) -> Self {
        Self {
            identity,
            credentials,
        }
    }
}
