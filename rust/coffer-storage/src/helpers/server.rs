//! In-memory S3-compatible test server.
//!
//! Implements just what the gateway uses: `PutObject` and a single-page
//! `ListObjectsV2` that honors `max-keys`.
use super::{S3Address, S3Settings};
use async_trait::async_trait;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use s3s::dto::{
    ETag, ListObjectsV2Input, ListObjectsV2Output, Object, PutObjectInput, PutObjectOutput,
    Timestamp,
};
use s3s::service::S3ServiceBuilder;
use s3s::{S3, S3Request, S3Response, S3Result, s3_error};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Page size S3 uses when the request names none.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Simple in-memory backend for testing.
///
/// Structure: bucket_name -> key -> StoredObject. Keys are kept sorted so
/// listings come back in S3's lexicographic order.
#[derive(Clone, Default)]
pub struct InMemoryS3 {
    buckets: Arc<RwLock<HashMap<String, BTreeMap<String, StoredObject>>>>,
}

#[derive(Clone)]
struct StoredObject {
    size: usize,
    e_tag: String,
    last_modified: Timestamp,
}

impl StoredObject {
    fn new(data: &[u8]) -> Self {
        Self {
            size: data.len(),
            e_tag: format!("{:x}", md5::compute(data)),
            last_modified: Timestamp::from(SystemTime::now()),
        }
    }
}

impl InMemoryS3 {
    /// Create a bucket if it doesn't exist.
    pub async fn create_bucket(&self, bucket: &str) {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default();
    }

    /// Store an object directly, bypassing HTTP and authentication.
    pub async fn insert(&self, bucket: &str, key: &str, data: &[u8]) {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), StoredObject::new(data));
    }

    /// Number of objects in a bucket, if it exists.
    pub async fn object_count(&self, bucket: &str) -> Option<usize> {
        self.buckets.read().await.get(bucket).map(BTreeMap::len)
    }
}

#[async_trait]
impl S3 for InMemoryS3 {
    async fn put_object(
        &self,
        req: S3Request<PutObjectInput>,
    ) -> S3Result<S3Response<PutObjectOutput>> {
        let bucket = req.input.bucket.clone();
        let key = req.input.key.clone();

        let data = if let Some(mut body) = req.input.body {
            use futures_util::StreamExt;
            let mut chunks = Vec::new();
            while let Some(result) = body.next().await {
                if let Ok(bytes) = result {
                    chunks.extend_from_slice(&bytes);
                }
            }
            chunks
        } else {
            Vec::new()
        };

        let stored = StoredObject::new(&data);
        let e_tag = stored.e_tag.clone();

        let mut buckets = self.buckets.write().await;
        // Writes to unknown buckets fail like they do on real S3
        let bucket_contents = buckets
            .get_mut(&bucket)
            .ok_or_else(|| s3_error!(NoSuchBucket))?;
        bucket_contents.insert(key, stored);

        let output = PutObjectOutput {
            e_tag: Some(ETag::Strong(e_tag)),
            ..Default::default()
        };
        Ok(S3Response::new(output))
    }

    async fn list_objects_v2(
        &self,
        req: S3Request<ListObjectsV2Input>,
    ) -> S3Result<S3Response<ListObjectsV2Output>> {
        let bucket = &req.input.bucket;
        let prefix = req.input.prefix.as_deref().unwrap_or("");
        let max_keys = req
            .input
            .max_keys
            .map(|max_keys| max_keys.max(0) as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let buckets = self.buckets.read().await;

        // Return NoSuchBucket error if bucket doesn't exist (matches real S3 behavior)
        let bucket_contents = buckets.get(bucket).ok_or_else(|| s3_error!(NoSuchBucket))?;

        let mut matching = bucket_contents
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .peekable();

        let mut contents = Vec::new();
        while contents.len() < max_keys {
            let Some((key, obj)) = matching.next() else {
                break;
            };
            contents.push(Object {
                key: Some(key.clone()),
                size: Some(obj.size as i64),
                e_tag: Some(ETag::Strong(obj.e_tag.clone())),
                last_modified: Some(obj.last_modified.clone()),
                ..Default::default()
            });
        }
        let is_truncated = matching.peek().is_some();

        let output = ListObjectsV2Output {
            name: Some(bucket.clone()),
            key_count: Some(contents.len() as i32),
            max_keys: Some(max_keys as i32),
            contents: Some(contents),
            is_truncated: Some(is_truncated),
            ..Default::default()
        };
        Ok(S3Response::new(output))
    }
}

/// A running S3 test server instance.
pub struct LocalS3 {
    /// The endpoint URL where the server is listening
    pub endpoint: String,
    storage: InMemoryS3,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl LocalS3 {
    /// Start a test server with authentication and pre-created buckets.
    pub async fn start_with_auth(
        access_key: &str,
        secret_key: &str,
        buckets: &[&str],
    ) -> anyhow::Result<LocalS3> {
        let storage = InMemoryS3::default();

        for bucket in buckets {
            storage.create_bucket(bucket).await;
        }

        let mut builder = S3ServiceBuilder::new(storage.clone());
        builder.set_auth(s3s::auth::SimpleAuth::from_single(access_key, secret_key));
        let s3_service = builder.build();

        let service = ServiceBuilder::new()
            .layer(CorsLayer::very_permissive().expose_headers([
                hyper::header::ETAG,
                hyper::header::CONTENT_LENGTH,
                hyper::header::CONTENT_TYPE,
            ]))
            .service(s3_service);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let endpoint = format!("http://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = listener.accept() => {
                        if let Ok((stream, _)) = result {
                            let hyper_service = TowerToHyperService::new(service.clone());
                            tokio::spawn(async move {
                                let _ = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), hyper_service)
                                    .await;
                            });
                        }
                    }
                }
            }
        });

        Ok(LocalS3 {
            endpoint,
            storage,
            shutdown_tx,
        })
    }

    /// The backing store, for seeding and inspecting objects.
    pub fn storage(&self) -> &InMemoryS3 {
        &self.storage
    }

    /// Stop the server.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start an authenticated local S3 server.
pub async fn start(settings: S3Settings) -> anyhow::Result<(S3Address, LocalS3)> {
    let bucket = if settings.bucket.is_empty() {
        "test-bucket"
    } else {
        &settings.bucket
    };
    let server = LocalS3::start_with_auth(
        &settings.access_key_id,
        &settings.secret_access_key,
        &[bucket],
    )
    .await?;
    let address = S3Address {
        endpoint: server.endpoint.clone(),
        bucket: bucket.to_string(),
        access_key_id: settings.access_key_id,
        secret_access_key: settings.secret_access_key,
    };
    Ok((address, server))
}
