pub mod aws;
pub mod kms;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::StoreError;
use crate::object::model::{
    CannedAcl, ChecksumAlgorithm, LegalHoldStatus, ObjectMetadata, ObjectVersion, RetentionMode,
};

pub use aws::AwsObjectStore;
pub use kms::{AwsKmsKeyResolver, KmsKeyResolver};

/// One page request of a version listing
#[derive(Debug, Clone, Default)]
pub struct ListVersionsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
    pub max_keys: Option<i32>,
}

/// One page of versions and delete markers
#[derive(Debug, Clone, Default)]
pub struct ListVersionsPage {
    pub versions: Vec<ObjectVersion>,
    pub delete_markers: Vec<ObjectVersion>,
    pub is_truncated: bool,
    pub next_key_marker: Option<String>,
    pub next_version_id_marker: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HeadObjectRequest {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    /// Only succeed if the current ETag matches
    pub if_match: Option<String>,
    /// Ask the service to return stored checksums
    pub checksum_mode: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteObjectRequest {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub bypass_governance_retention: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PutRetentionRequest {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub mode: Option<RetentionMode>,
    pub retain_until: Option<DateTime<Utc>>,
    pub bypass_governance_retention: bool,
}

/// A single-part upload. Only set fields are sent.
#[derive(Debug, Clone, Default)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub acl: Option<CannedAcl>,
    pub bucket_key_enabled: Option<bool>,
    pub cache_control: Option<String>,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    pub kms_key_id: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub object_lock_legal_hold_status: Option<LegalHoldStatus>,
    pub object_lock_mode: Option<RetentionMode>,
    pub object_lock_retain_until_date: Option<DateTime<Utc>>,
    pub server_side_encryption: Option<String>,
    pub storage_class: Option<String>,
    /// URL-encoded tag set (`k1=v1&k2=v2`)
    pub tagging: Option<String>,
    pub website_redirect: Option<String>,
}

impl PutObjectRequest {
    pub fn has_object_lock_parameters(&self) -> bool {
        self.object_lock_legal_hold_status.is_some()
            || self.object_lock_mode.is_some()
            || self.object_lock_retain_until_date.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

/// Object-storage API used by the lifecycle operations.
///
/// Implementations classify every failure into an
/// [`ErrorKind`](crate::error::ErrorKind); callers never inspect vendor errors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of versions and delete markers
    async fn list_object_versions(
        &self,
        request: ListVersionsRequest,
    ) -> Result<ListVersionsPage, StoreError>;

    /// Metadata-only fetch; `Ok(None)` means the call returned no payload
    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<Option<ObjectMetadata>, StoreError>;

    async fn delete_object(&self, request: DeleteObjectRequest) -> Result<(), StoreError>;

    async fn put_object_legal_hold(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        status: LegalHoldStatus,
    ) -> Result<(), StoreError>;

    async fn put_object_retention(&self, request: PutRetentionRequest) -> Result<(), StoreError>;

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StoreError>;

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl)
        -> Result<(), StoreError>;

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<HashMap<String, String>, StoreError>;

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &HashMap<String, String>,
    ) -> Result<(), StoreError>;

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), StoreError>;
}
