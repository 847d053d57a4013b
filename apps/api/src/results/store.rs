//! Result storage behind a trait, so object storage can be swapped for memory.
//!
//! `AppState` holds an `Arc<dyn ResultStore>`, chosen at startup by `RESULT_STORE`.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::AppError;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Writes a JSON document under `key`, replacing any previous one.
    async fn put_json(&self, key: &str, body: Bytes) -> Result<(), AppError>;

    /// Reads the document under `key`. `None` when it does not exist.
    async fn get_json(&self, key: &str) -> Result<Option<Bytes>, AppError>;

    /// Short name for logs.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// S3-compatible object storage
// ────────────────────────────────────────────────────────────────────────────

/// Bucket-backed store. Speaks S3, so it works with GCS interoperability and MinIO.
pub struct S3ResultStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ResultStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ResultStore for S3ResultStore {
    async fn put_json(&self, key: &str, body: Bytes) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload of {key} failed: {e}")))?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<Bytes>, AppError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if matches!(e.as_service_error(), Some(GetObjectError::NoSuchKey(_))) {
                    debug!("s3://{}/{} does not exist", self.bucket, key);
                    return Ok(None);
                }
                return Err(AppError::Storage(format!("Download of {key} failed: {e}")));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Reading {key} failed: {e}")))?;
        Ok(Some(bytes.into_bytes()))
    }

    fn backend(&self) -> &'static str {
        "object_storage"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store
// ────────────────────────────────────────────────────────────────────────────

/// Process-local store for development and tests. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryResultStore {
    documents: RwLock<HashMap<String, Bytes>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryResultStore {
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.documents.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn put_json(&self, key: &str, body: Bytes) -> Result<(), AppError> {
        self.documents.write().await.insert(key.to_string(), body);
        Ok(())
    }

    async fn get_json(&self, key: &str) -> Result<Option<Bytes>, AppError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
