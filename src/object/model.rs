use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ObjectError;

/// Storage class reported when the service omits the field
pub const STANDARD_STORAGE_CLASS: &str = "STANDARD";

/// Storage classes accepted in an object spec
pub const STORAGE_CLASSES: &[&str] = &[
    "STANDARD",
    "REDUCED_REDUNDANCY",
    "STANDARD_IA",
    "ONEZONE_IA",
    "INTELLIGENT_TIERING",
    "GLACIER",
    "DEEP_ARCHIVE",
    "OUTPOSTS",
    "GLACIER_IR",
    "SNOW",
    "EXPRESS_ONEZONE",
];

/// One version (or delete marker) of an object.
///
/// Identity is `(bucket, key, version_id)`; `None` addresses the current or
/// unversioned object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub bucket: String,
    pub key: String,
    pub version_id: Option<String>,
    pub is_delete_marker: bool,
}

impl ObjectVersion {
    pub fn version(bucket: &str, key: &str, version_id: Option<String>) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id,
            is_delete_marker: false,
        }
    }

    pub fn delete_marker(bucket: &str, key: &str, version_id: Option<String>) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id,
            is_delete_marker: true,
        }
    }

    /// Version id for log lines ("" for the current version)
    pub fn version_label(&self) -> &str {
        self.version_id.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegalHoldStatus {
    On,
    Off,
}

impl LegalHoldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalHoldStatus::On => "ON",
            LegalHoldStatus::Off => "OFF",
        }
    }
}

impl FromStr for LegalHoldStatus {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(LegalHoldStatus::On),
            "OFF" => Ok(LegalHoldStatus::Off),
            other => Err(ObjectError::invalid(format!(
                "object_lock_legal_hold_status must be one of ON, OFF (got {:?})",
                other
            ))),
        }
    }
}

impl fmt::Display for LegalHoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object lock retention mode
///
/// Governance can be overridden with a bypass flag, compliance cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetentionMode {
    Governance,
    Compliance,
}

impl RetentionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionMode::Governance => "GOVERNANCE",
            RetentionMode::Compliance => "COMPLIANCE",
        }
    }
}

impl FromStr for RetentionMode {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GOVERNANCE" => Ok(RetentionMode::Governance),
            "COMPLIANCE" => Ok(RetentionMode::Compliance),
            other => Err(ObjectError::invalid(format!(
                "object_lock_mode must be one of GOVERNANCE, COMPLIANCE (got {:?})",
                other
            ))),
        }
    }
}

impl fmt::Display for RetentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChecksumAlgorithm {
    Crc32,
    Crc32c,
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "CRC32",
            ChecksumAlgorithm::Crc32c => "CRC32C",
            ChecksumAlgorithm::Sha1 => "SHA1",
            ChecksumAlgorithm::Sha256 => "SHA256",
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRC32" => Ok(ChecksumAlgorithm::Crc32),
            "CRC32C" => Ok(ChecksumAlgorithm::Crc32c),
            "SHA1" => Ok(ChecksumAlgorithm::Sha1),
            "SHA256" => Ok(ChecksumAlgorithm::Sha256),
            other => Err(ObjectError::invalid(format!(
                "checksum_algorithm must be one of CRC32, CRC32C, SHA1, SHA256 (got {:?})",
                other
            ))),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ServerSideEncryption {
    #[serde(rename = "AES256")]
    Aes256,
    #[serde(rename = "aws:kms")]
    AwsKms,
    #[serde(rename = "aws:kms:dsse")]
    AwsKmsDsse,
}

impl ServerSideEncryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerSideEncryption::Aes256 => "AES256",
            ServerSideEncryption::AwsKms => "aws:kms",
            ServerSideEncryption::AwsKmsDsse => "aws:kms:dsse",
        }
    }
}

impl fmt::Display for ServerSideEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canned ACLs accepted by PutObject / PutObjectAcl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CannedAcl {
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    AwsExecRead,
    BucketOwnerRead,
    BucketOwnerFullControl,
}

impl CannedAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::AwsExecRead => "aws-exec-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

impl fmt::Display for CannedAcl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object lock state of one version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionState {
    pub legal_hold: Option<LegalHoldStatus>,
    pub mode: Option<RetentionMode>,
    pub retain_until: Option<DateTime<Utc>>,
}

impl RetentionState {
    pub fn legal_hold_active(&self) -> bool {
        self.legal_hold == Some(LegalHoldStatus::On)
    }
}

/// Metadata of one object as returned by a head request.
///
/// Checksums are only present when checksum mode was requested and the object
/// was stored with that checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// ETag without surrounding quotes
    pub etag: Option<String>,
    /// Always populated; defaults to [`STANDARD_STORAGE_CLASS`]
    pub storage_class: String,
    pub server_side_encryption: Option<String>,
    pub kms_key_id: Option<String>,
    pub bucket_key_enabled: bool,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    pub checksum_crc32: Option<String>,
    pub checksum_crc32c: Option<String>,
    pub checksum_sha1: Option<String>,
    pub checksum_sha256: Option<String>,
    pub metadata: HashMap<String, String>,
    pub retention: RetentionState,
    pub version_id: Option<String>,
    pub website_redirect: Option<String>,
}

impl Default for ObjectMetadata {
    fn default() -> Self {
        Self {
            etag: None,
            storage_class: STANDARD_STORAGE_CLASS.to_string(),
            server_side_encryption: None,
            kms_key_id: None,
            bucket_key_enabled: false,
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_language: None,
            content_type: None,
            checksum_crc32: None,
            checksum_crc32c: None,
            checksum_sha1: None,
            checksum_sha256: None,
            metadata: HashMap::new(),
            retention: RetentionState::default(),
            version_id: None,
            website_redirect: None,
        }
    }
}

impl ObjectMetadata {
    /// Storage class from a response field that the service omits for STANDARD
    pub fn storage_class_or_default(storage_class: Option<&str>) -> String {
        match storage_class {
            Some(class) if !class.is_empty() => class.to_string(),
            _ => STANDARD_STORAGE_CLASS.to_string(),
        }
    }

    /// Trim the quotes the service wraps ETags in
    pub fn clean_etag(etag: Option<&str>) -> Option<String> {
        etag.map(|e| e.trim_matches('"').to_string())
    }
}

/// Parse an RFC 3339 date; invalid or empty input yields `None`
pub fn expand_object_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Format a date as RFC 3339, empty when absent
pub fn flatten_object_date(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_storage_class_default() {
        assert_eq!(ObjectMetadata::storage_class_or_default(None), "STANDARD");
        assert_eq!(ObjectMetadata::storage_class_or_default(Some("")), "STANDARD");
        assert_eq!(
            ObjectMetadata::storage_class_or_default(Some("GLACIER")),
            "GLACIER"
        );
        assert_eq!(ObjectMetadata::default().storage_class, "STANDARD");
    }

    #[test]
    fn test_clean_etag() {
        assert_eq!(
            ObjectMetadata::clean_etag(Some("\"d41d8cd98f00b204e9800998ecf8427e\"")),
            Some("d41d8cd98f00b204e9800998ecf8427e".to_string())
        );
        assert_eq!(ObjectMetadata::clean_etag(None), None);
    }

    #[test]
    fn test_object_dates() {
        let date = expand_object_date("2030-01-02T03:04:05Z").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap());
        assert_eq!(flatten_object_date(Some(&date)), "2030-01-02T03:04:05Z");
        assert_eq!(flatten_object_date(None), "");
        assert!(expand_object_date("not a date").is_none());
        assert!(expand_object_date("").is_none());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("ON".parse::<LegalHoldStatus>().unwrap(), LegalHoldStatus::On);
        assert!("on".parse::<LegalHoldStatus>().is_err());
        assert_eq!(
            "COMPLIANCE".parse::<RetentionMode>().unwrap(),
            RetentionMode::Compliance
        );
        assert!("LOCKED".parse::<RetentionMode>().is_err());
    }

    #[test]
    fn test_legal_hold_active() {
        let mut retention = RetentionState::default();
        assert!(!retention.legal_hold_active());
        retention.legal_hold = Some(LegalHoldStatus::Off);
        assert!(!retention.legal_hold_active());
        retention.legal_hold = Some(LegalHoldStatus::On);
        assert!(retention.legal_hold_active());
    }
}
