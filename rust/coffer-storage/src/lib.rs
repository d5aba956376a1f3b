//! Storage gateway for S3-compatible object stores.
//!
//! The [`Gateway`] issues exactly two kinds of request, both presigned with
//! the caller's [`TemporaryCredentials`](coffer_credentials::TemporaryCredentials):
//!
//! - [`Gateway::list_objects`] - one ListObjectsV2 page of at most `max_keys` objects
//! - [`Gateway::put_object`] - one object write with a SHA-256 checksum header
//!
//! Each call opens an ephemeral [`Bucket`] scoped to the credentials it was
//! given and drops it when the call returns. Nothing is retried and listings
//! are never paginated.
//!
//! ```no_run
//! use coffer_credentials::TemporaryCredentials;
//! use coffer_storage::{DEFAULT_MAX_KEYS, Gateway, GatewaySettings};
//!
//! # async fn example() -> Result<(), coffer_storage::StorageError> {
//! let gateway = Gateway::new(GatewaySettings::default())?;
//! let credentials = TemporaryCredentials::new("ASIAEXAMPLE", "secret").with_session_token("token");
//!
//! for object in gateway.list_objects(&credentials, "my-bucket", DEFAULT_MAX_KEYS).await? {
//!     println!("{}", object.key);
//! }
//! # Ok(())
//! # }
//! ```

mod bucket;
mod error;
mod gateway;
pub mod list;
pub mod request;

#[cfg(feature = "helpers")]
pub mod helpers;

pub use bucket::Bucket;
pub use error::StorageError;
pub use gateway::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_KEYS, DEFAULT_REGION, Gateway, GatewaySettings,
    test_object_body, test_object_key,
};
pub use list::{ListResult, ObjectSummary};
pub use request::PutReceipt;
