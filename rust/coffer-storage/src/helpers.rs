//! Testing helpers for storage integration tests.
//!
//! Starts an in-memory S3-compatible server on a random local port with
//! SigV4 authentication enabled, so tests exercise the same presigned
//! requests a real store would receive.
//!
//! ```rs
//! use coffer_storage::Gateway;
//! use coffer_storage::helpers::{S3Settings, start};
//!
//! #[tokio::test]
//! async fn it_lists() -> anyhow::Result<()> {
//!     let (env, server) = start(S3Settings::default()).await?;
//!     let gateway = Gateway::new(env.gateway_settings())?;
//!     let objects = gateway.list_objects(&env.credentials(), &env.bucket, 10).await?;
//!     server.stop();
//!     Ok(())
//! }
//! ```

use coffer_credentials::TemporaryCredentials;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_REGION, GatewaySettings};

mod server;

pub use server::{InMemoryS3, LocalS3, start};

/// S3 test server connection info with credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Address {
    /// The endpoint URL of the running S3 server (e.g., "http://127.0.0.1:9000")
    pub endpoint: String,
    /// The bucket created for the test
    pub bucket: String,
    /// Access key ID the server accepts
    pub access_key_id: String,
    /// Secret access key the server accepts
    pub secret_access_key: String,
}

impl S3Address {
    /// Credentials the server accepts.
    pub fn credentials(&self) -> TemporaryCredentials {
        TemporaryCredentials::new(&self.access_key_id, &self.secret_access_key)
    }

    /// Gateway settings pointing at the server.
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            endpoint: self.endpoint.clone(),
            region: DEFAULT_REGION.to_string(),
            ..Default::default()
        }
    }
}

/// Settings for configuring the S3 test server.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// The bucket name to create. Defaults to "test-bucket".
    pub bucket: String,
    /// AWS access key ID. Defaults to "test-access-key".
    pub access_key_id: String,
    /// AWS secret access key. Defaults to "test-secret-key".
    pub secret_access_key: String,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            access_key_id: "test-access-key".to_string(),
            secret_access_key: "test-secret-key".to_string(),
        }
    }
}
