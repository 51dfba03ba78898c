use serde::Serialize;
use std::collections::HashMap;

use crate::object::model::{flatten_object_date, ObjectMetadata};

/// Observed state of an object, as recorded after a read.
///
/// Absent string attributes are empty, never missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObjectState {
    /// Identity of the managed object (its key as configured)
    pub id: String,
    pub bucket: String,
    pub key: String,
    pub bucket_key_enabled: bool,
    pub cache_control: String,
    pub checksum_crc32: String,
    pub checksum_crc32c: String,
    pub checksum_sha1: String,
    pub checksum_sha256: String,
    pub content_disposition: String,
    pub content_encoding: String,
    pub content_language: String,
    pub content_type: String,
    pub etag: String,
    /// Only set for keys other than the account's default S3 key
    pub kms_key_id: String,
    pub metadata: HashMap<String, String>,
    pub object_lock_legal_hold_status: String,
    pub object_lock_mode: String,
    pub object_lock_retain_until_date: String,
    pub server_side_encryption: String,
    pub storage_class: String,
    pub tags: HashMap<String, String>,
    pub version_id: String,
    pub website_redirect: String,
}

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

impl ObjectState {
    /// Populate from head metadata. KMS key id and tags are filled in by the caller.
    pub fn from_metadata(id: &str, bucket: &str, key: &str, metadata: &ObjectMetadata) -> Self {
        let retention = &metadata.retention;

        Self {
            id: id.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            bucket_key_enabled: metadata.bucket_key_enabled,
            cache_control: or_empty(&metadata.cache_control),
            checksum_crc32: or_empty(&metadata.checksum_crc32),
            checksum_crc32c: or_empty(&metadata.checksum_crc32c),
            checksum_sha1: or_empty(&metadata.checksum_sha1),
            checksum_sha256: or_empty(&metadata.checksum_sha256),
            content_disposition: or_empty(&metadata.content_disposition),
            content_encoding: or_empty(&metadata.content_encoding),
            content_language: or_empty(&metadata.content_language),
            content_type: or_empty(&metadata.content_type),
            etag: ObjectMetadata::clean_etag(metadata.etag.as_deref()).unwrap_or_default(),
            kms_key_id: String::new(),
            metadata: metadata.metadata.clone(),
            object_lock_legal_hold_status: retention
                .legal_hold
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            object_lock_mode: retention
                .mode
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            object_lock_retain_until_date: flatten_object_date(retention.retain_until.as_ref()),
            server_side_encryption: or_empty(&metadata.server_side_encryption),
            storage_class: ObjectMetadata::storage_class_or_default(Some(&metadata.storage_class)),
            tags: HashMap::new(),
            version_id: or_empty(&metadata.version_id),
            website_redirect: or_empty(&metadata.website_redirect),
        }
    }

    /// Whether a bulk version delete applies (the bucket reported a version)
    pub fn has_version(&self) -> bool {
        !self.version_id.is_empty()
    }
}
