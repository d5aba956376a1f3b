//! Gateway integration tests against the in-process S3 server.
//!
//! Run with:
//! ```bash
//! cargo test -p coffer-storage --features helpers
//! ```

#![cfg(feature = "helpers")]

use anyhow::Result;
use chrono::Utc;
use coffer_credentials::TemporaryCredentials;
use coffer_storage::helpers::{S3Settings, start};
use coffer_storage::{
    DEFAULT_MAX_KEYS, Gateway, StorageError, test_object_body, test_object_key,
};

#[tokio::test]
async fn it_lists_every_object_when_under_limit() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    for key in ["b.txt", "a.txt", "c/d.txt"] {
        server.storage().insert(&env.bucket, key, b"data").await;
    }

    let gateway = Gateway::new(env.gateway_settings())?;
    let objects = gateway
        .list_objects(&env.credentials(), &env.bucket, DEFAULT_MAX_KEYS)
        .await?;

    let keys: Vec<_> = objects.iter().map(|object| object.key.as_str()).collect();
    assert_eq!(keys, vec!["a.txt", "b.txt", "c/d.txt"]);
    assert!(objects.iter().all(|object| object.size_bytes == Some(4)));
    assert!(objects.iter().all(|object| object.last_modified.is_some()));

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_truncates_listing_to_max_keys() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    for index in 0..15 {
        server
            .storage()
            .insert(&env.bucket, &format!("object-{:02}", index), b"x")
            .await;
    }

    let gateway = Gateway::new(env.gateway_settings())?;
    let objects = gateway
        .list_objects(&env.credentials(), &env.bucket, DEFAULT_MAX_KEYS)
        .await?;

    assert_eq!(objects.len(), 10);
    assert_eq!(objects[0].key, "object-00");
    assert_eq!(objects[9].key, "object-09");

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_lists_empty_bucket() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;

    let gateway = Gateway::new(env.gateway_settings())?;
    let objects = gateway
        .list_objects(&env.credentials(), &env.bucket, DEFAULT_MAX_KEYS)
        .await?;

    assert!(objects.is_empty());

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_lists_written_object() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    let gateway = Gateway::new(env.gateway_settings())?;
    let credentials = env.credentials();

    let now = Utc::now();
    let key = test_object_key(now);
    let body = test_object_body(now);

    let receipt = gateway
        .put_object(&credentials, &env.bucket, &key, body.clone(), "text/plain")
        .await?;
    assert_eq!(receipt.key, key);
    assert_eq!(
        receipt.e_tag,
        Some(format!("{:x}", md5::compute(body.as_bytes())))
    );

    let objects = gateway
        .list_objects(&credentials, &env.bucket, DEFAULT_MAX_KEYS)
        .await?;
    let written = objects
        .iter()
        .find(|object| object.key == key)
        .expect("written object should be listed");
    assert_eq!(written.size_bytes, Some(body.len() as u64));

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_writes_keys_that_need_encoding() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    let gateway = Gateway::new(env.gateway_settings())?;
    let credentials = env.credentials();

    gateway
        .put_object(&credentials, &env.bucket, "notes/hello world+1.txt", "hi", "text/plain")
        .await?;

    let objects = gateway
        .list_objects(&credentials, &env.bucket, DEFAULT_MAX_KEYS)
        .await?;
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].key, "notes/hello world+1.txt");

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_returns_identical_listings_without_writes() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    for key in ["one", "two", "three"] {
        server.storage().insert(&env.bucket, key, key.as_bytes()).await;
    }

    let gateway = Gateway::new(env.gateway_settings())?;
    let credentials = env.credentials();

    let first = gateway
        .list_objects(&credentials, &env.bucket, DEFAULT_MAX_KEYS)
        .await?;
    let second = gateway
        .list_objects(&credentials, &env.bucket, DEFAULT_MAX_KEYS)
        .await?;

    assert_eq!(first, second);

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_rejects_wrong_secret() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    let gateway = Gateway::new(env.gateway_settings())?;
    let credentials = TemporaryCredentials::new(&env.access_key_id, "wrong-secret");

    let result = gateway
        .list_objects(&credentials, &env.bucket, DEFAULT_MAX_KEYS)
        .await;
    assert!(
        matches!(result, Err(StorageError::Unauthorized(_))),
        "Expected Unauthorized, got: {:?}",
        result
    );

    let result = gateway
        .put_object(&credentials, &env.bucket, "key", "body", "text/plain")
        .await;
    assert!(
        matches!(result, Err(StorageError::Unauthorized(_))),
        "Expected Unauthorized, got: {:?}",
        result
    );
    assert_eq!(server.storage().object_count(&env.bucket).await, Some(0));

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_rejects_unknown_access_key() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    let gateway = Gateway::new(env.gateway_settings())?;
    let credentials = TemporaryCredentials::new("someone-else", &env.secret_access_key);

    let result = gateway
        .list_objects(&credentials, &env.bucket, DEFAULT_MAX_KEYS)
        .await;
    assert!(
        matches!(result, Err(StorageError::Unauthorized(_))),
        "Expected Unauthorized, got: {:?}",
        result
    );

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_reports_missing_bucket() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    let gateway = Gateway::new(env.gateway_settings())?;

    let result = gateway
        .list_objects(&env.credentials(), "no-such-bucket", DEFAULT_MAX_KEYS)
        .await;
    assert!(
        matches!(result, Err(StorageError::NotFound(ref msg)) if msg.contains("NoSuchBucket")),
        "Expected NotFound, got: {:?}",
        result
    );

    server.stop();
    Ok(())
}

#[tokio::test]
async fn it_refuses_empty_bucket_name() -> Result<()> {
    let (env, server) = start(S3Settings::default()).await?;
    let gateway = Gateway::new(env.gateway_settings())?;
    let credentials = env.credentials();

    assert_eq!(
        gateway.list_objects(&credentials, "", DEFAULT_MAX_KEYS).await,
        Err(StorageError::InvalidBucket)
    );
    assert_eq!(
        gateway
            .put_object(&credentials, "", "key", "body", "text/plain")
            .await,
        Err(StorageError::InvalidBucket)
    );
    assert_eq!(server.storage().object_count(&env.bucket).await, Some(0));

    server.stop();
    Ok(())
}
