use serde::{Deserialize, Serialize};

/// The signed-in user.
///
/// Obtained once per sign-in and immutable for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity_id: Option<String>,
}

impl Identity {
    /// Create an identity for the given user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_label: None,
            identity_id: None,
        }
    }

    /// Attach a human-readable label (e.g. the sign-in email).
    pub fn with_display_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = Some(label.into());
        self
    }

    /// Attach the issuer's stable per-user identifier.
    pub fn with_identity_id(mut self, identity_id: impl Into<String>) -> Self {
        self.identity_id = Some(identity_id.into());
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn display_label(&self) -> Option<&str> {
        self.display_label.as_deref()
    }

    pub fn identity_id(&self) -> Option<&str> {
        self.identity_id.as_deref()
    }
}
