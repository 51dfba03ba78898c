use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ObjectError;
use crate::object::key::clean_key;
use crate::object::model::{
    expand_object_date, CannedAcl, ChecksumAlgorithm, LegalHoldStatus, RetentionMode,
    ServerSideEncryption, STORAGE_CLASSES,
};

/// Desired state of one object.
///
/// Deserialised from a TOML or JSON document and checked once with
/// [`validate`](Self::validate) before any store call is made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    pub bucket: String,
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<CannedAcl>,
    #[serde(default)]
    pub bucket_key_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_algorithm: Option<ChecksumAlgorithm>,

    /// Literal UTF-8 body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Base64-encoded binary body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_base64: Option<String>,
    /// Path of a local file to upload; `~` expands to the home directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Opaque value whose change forces a re-upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Remove object-lock protection when deleting
    #[serde(default)]
    pub force_destroy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_lock_legal_hold_status: Option<LegalHoldStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_lock_mode: Option<RetentionMode>,
    /// RFC 3339 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_lock_retain_until_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<ServerSideEncryption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_redirect: Option<String>,
}

/// Computed attributes that become unknown after a change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputedChanges {
    pub version_id: bool,
}

impl ObjectSpec {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn from_json(document: &str) -> Result<Self, ObjectError> {
        serde_json::from_str(document)
            .map_err(|e| ObjectError::invalid(format!("parsing object spec: {}", e)))
    }

    pub fn validate(&self) -> Result<(), ObjectError> {
        if self.bucket.is_empty() {
            return Err(ObjectError::invalid("bucket must not be empty"));
        }
        if self.key.is_empty() {
            return Err(ObjectError::invalid("key must not be empty"));
        }

        let bodies = [&self.source, &self.content, &self.content_base64]
            .iter()
            .filter(|b| b.is_some())
            .count();
        if bodies > 1 {
            return Err(ObjectError::invalid(
                "only one of source, content and content_base64 may be set",
            ));
        }

        if self.etag.is_some() && self.kms_key_id.is_some() {
            return Err(ObjectError::invalid("etag conflicts with kms_key_id"));
        }

        if let Some(key) = self.metadata.keys().find(|k| **k != k.to_lowercase()) {
            return Err(ObjectError::invalid(format!(
                "Metadata must be lowercase only. Offending key: {:?}",
                key
            )));
        }

        if let Some(date) = &self.object_lock_retain_until_date {
            if expand_object_date(date).is_none() {
                return Err(ObjectError::invalid(format!(
                    "object_lock_retain_until_date must be an RFC 3339 timestamp (got {:?})",
                    date
                )));
            }
        }

        if let Some(class) = &self.storage_class {
            if !STORAGE_CLASSES.contains(&class.as_str()) {
                return Err(ObjectError::invalid(format!(
                    "storage_class must be one of {} (got {:?})",
                    STORAGE_CLASSES.join(", "),
                    class
                )));
            }
        }

        Ok(())
    }

    /// Key as sent to the service
    pub fn clean_key(&self) -> String {
        clean_key(&self.key)
    }

    pub fn retain_until(&self) -> Option<DateTime<Utc>> {
        self.object_lock_retain_until_date
            .as_deref()
            .and_then(expand_object_date)
    }

    /// Whether moving from `old` to `self` requires uploading the body again
    pub fn content_changed(&self, old: &ObjectSpec) -> bool {
        self.bucket_key_enabled != old.bucket_key_enabled
            || self.cache_control != old.cache_control
            || self.checksum_algorithm != old.checksum_algorithm
            || self.content != old.content
            || self.content_base64 != old.content_base64
            || self.content_disposition != old.content_disposition
            || self.content_encoding != old.content_encoding
            || self.content_language != old.content_language
            || self.content_type != old.content_type
            || self.etag != old.etag
            || self.kms_key_id != old.kms_key_id
            || self.metadata != old.metadata
            || self.server_side_encryption != old.server_side_encryption
            || self.source != old.source
            || self.source_hash != old.source_hash
            || self.storage_class != old.storage_class
            || self.website_redirect != old.website_redirect
    }

    /// Computed attributes a change from `old` to `self` invalidates
    pub fn plan_computed(&self, old: &ObjectSpec) -> ComputedChanges {
        ComputedChanges {
            version_id: self.content_changed(old),
        }
    }
}
