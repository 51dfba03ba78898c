//! In-process object store used by the unit tests.
//!
//! Emulates the parts of S3 the lifecycle code depends on: versioned and
//! unversioned buckets, delete markers, legal hold, governance/compliance
//! retention, marker-based version pagination and object tagging. Faults can
//! be injected per operation and every mutating call is recorded.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use super::{
    DeleteObjectRequest, HeadObjectRequest, ListVersionsPage, ListVersionsRequest, ObjectStore,
    PutObjectOutput, PutObjectRequest, PutRetentionRequest,
};
use crate::error::StoreError;
use crate::object::model::{
    CannedAcl, ChecksumAlgorithm, LegalHoldStatus, ObjectMetadata, ObjectVersion, RetentionMode,
    RetentionState,
};

const DEFAULT_MAX_KEYS: usize = 1000;
const OBJECT_LOCK_DENIED: &str = "Access Denied because object protected by object lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    ListObjectVersions,
    HeadObject,
    DeleteObject,
    PutObjectLegalHold,
    PutObjectRetention,
    PutObject,
    PutObjectAcl,
    GetObjectTagging,
    PutObjectTagging,
    DeleteObjectTagging,
}

/// A recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub op: Operation,
    pub key: String,
    pub version_id: Option<String>,
    pub bypass: bool,
    pub checksum_mode: bool,
}

struct Fault {
    op: Operation,
    skip: usize,
    error: StoreError,
}

struct Entry {
    key: String,
    seq: u64,
    version_id: String,
    is_delete_marker: bool,
    body: Bytes,
    metadata: ObjectMetadata,
    acl: Option<CannedAcl>,
    tags: HashMap<String, String>,
}

impl Entry {
    fn is_locked(&self, bypass: bool, now: DateTime<Utc>) -> bool {
        if self.metadata.retention.legal_hold_active() {
            return true;
        }
        match (self.metadata.retention.mode, self.metadata.retention.retain_until) {
            (Some(RetentionMode::Compliance), Some(until)) => until > now,
            (Some(RetentionMode::Governance), Some(until)) => until > now && !bypass,
            _ => false,
        }
    }
}

#[derive(Default)]
struct Bucket {
    versioned: bool,
    entries: Vec<Entry>,
    denied_keys: HashSet<String>,
}

impl Bucket {
    fn version_id(&self, seq: u64) -> String {
        if self.versioned {
            format!("v{}", seq)
        } else {
            "null".to_string()
        }
    }

    /// Newest entry for a key, if any
    fn latest(&self, key: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.key == key)
            .max_by_key(|e| e.seq)
    }

    fn find(&self, key: &str, version_id: Option<&str>) -> Option<&Entry> {
        match version_id {
            Some(v) => self
                .entries
                .iter()
                .find(|e| e.key == key && e.version_id == v),
            None => self.latest(key),
        }
    }

    fn find_mut(&mut self, key: &str, version_id: Option<&str>) -> Option<&mut Entry> {
        let seq = self.find(key, version_id).map(|e| e.seq)?;
        self.entries.iter_mut().find(|e| e.key == key && e.seq == seq)
    }
}

#[derive(Default)]
struct State {
    buckets: HashMap<String, Bucket>,
    next_seq: u64,
    faults: Vec<Fault>,
    calls: Vec<Call>,
}

impl State {
    fn take_fault(&mut self, op: Operation) -> Option<StoreError> {
        let index = self.faults.iter().position(|f| f.op == op)?;
        if self.faults[index].skip > 0 {
            self.faults[index].skip -= 1;
            return None;
        }
        Some(self.faults.remove(index).error)
    }

    fn record(&mut self, op: Operation, key: &str, version_id: Option<&str>, bypass: bool) {
        self.calls.push(Call {
            op,
            key: key.to_string(),
            version_id: version_id.map(str::to_string),
            bypass,
            checksum_mode: false,
        });
    }

    fn bucket(&mut self, name: &str) -> Result<&mut Bucket, StoreError> {
        self.buckets
            .get_mut(name)
            .ok_or_else(|| StoreError::no_such_bucket(name))
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Ordering position of a version id marker within its key
fn marker_seq(version_id: &str) -> u64 {
    version_id
        .strip_prefix('v')
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

pub(crate) struct MemoryObjectStore {
    state: Mutex<State>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    pub async fn create_bucket(&self, name: &str, versioned: bool) {
        let mut state = self.state.lock().await;
        state.buckets.insert(
            name.to_string(),
            Bucket {
                versioned,
                ..Default::default()
            },
        );
    }

    /// Upload `body` and return the new version id
    pub async fn put(&self, bucket: &str, key: &str, body: &str) -> String {
        let output = self
            .put_object(PutObjectRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                body: Bytes::from(body.to_string()),
                ..Default::default()
            })
            .await
            .expect("put into memory bucket");
        output.version_id.unwrap_or_else(|| "null".to_string())
    }

    /// Add a delete marker on top of `key` and return its version id
    pub async fn add_delete_marker(&self, bucket: &str, key: &str) -> String {
        let mut state = self.state.lock().await;
        let seq = state.next_seq();
        let bucket = state.bucket(bucket).expect("bucket exists");
        let version_id = bucket.version_id(seq);
        bucket.entries.push(Entry {
            key: key.to_string(),
            seq,
            version_id: version_id.clone(),
            is_delete_marker: true,
            body: Bytes::new(),
            metadata: ObjectMetadata::default(),
            acl: None,
            tags: HashMap::new(),
        });
        version_id
    }

    pub async fn set_legal_hold(&self, bucket: &str, key: &str, version_id: &str, on: bool) {
        let mut state = self.state.lock().await;
        let entry = state
            .bucket(bucket)
            .expect("bucket exists")
            .find_mut(key, Some(version_id))
            .expect("version exists");
        entry.metadata.retention.legal_hold = Some(if on {
            LegalHoldStatus::On
        } else {
            LegalHoldStatus::Off
        });
    }

    pub async fn set_retention(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
        mode: RetentionMode,
        retain_until: DateTime<Utc>,
    ) {
        let mut state = self.state.lock().await;
        let entry = state
            .bucket(bucket)
            .expect("bucket exists")
            .find_mut(key, Some(version_id))
            .expect("version exists");
        entry.metadata.retention.mode = Some(mode);
        entry.metadata.retention.retain_until = Some(retain_until);
    }

    /// Deny every delete of `key`, like a bucket policy would
    pub async fn deny_deletes(&self, bucket: &str, key: &str) {
        let mut state = self.state.lock().await;
        state
            .bucket(bucket)
            .expect("bucket exists")
            .denied_keys
            .insert(key.to_string());
    }

    /// Fail the next call of `op`
    pub async fn fail_next(&self, op: Operation, error: StoreError) {
        self.fail_after(op, 0, error).await;
    }

    /// Let `skip` calls of `op` succeed, then fail one
    pub async fn fail_after(&self, op: Operation, skip: usize, error: StoreError) {
        let mut state = self.state.lock().await;
        state.faults.push(Fault { op, skip, error });
    }

    pub async fn calls(&self, op: Operation) -> Vec<Call> {
        let state = self.state.lock().await;
        state.calls.iter().filter(|c| c.op == op).cloned().collect()
    }

    /// All versions and delete markers still stored for a bucket
    pub async fn remaining(&self, bucket: &str) -> Vec<ObjectVersion> {
        let state = self.state.lock().await;
        state
            .buckets
            .get(bucket)
            .map(|b| {
                b.entries
                    .iter()
                    .map(|e| ObjectVersion {
                        bucket: bucket.to_string(),
                        key: e.key.clone(),
                        version_id: Some(e.version_id.clone()),
                        is_delete_marker: e.is_delete_marker,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn body(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.state.lock().await;
        state
            .buckets
            .get(bucket)
            .and_then(|b| b.latest(key))
            .filter(|e| !e.is_delete_marker)
            .map(|e| e.body.clone())
    }

    pub async fn acl(&self, bucket: &str, key: &str) -> Option<CannedAcl> {
        let state = self.state.lock().await;
        state
            .buckets
            .get(bucket)
            .and_then(|b| b.latest(key))
            .and_then(|e| e.acl)
    }
}

fn simulated_checksum(algorithm: ChecksumAlgorithm, body: &Bytes) -> String {
    format!("{}-{}", algorithm.as_str().to_lowercase(), body.len())
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_object_versions(
        &self,
        request: ListVersionsRequest,
    ) -> Result<ListVersionsPage, StoreError> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::ListObjectVersions,
            request.prefix.as_deref().unwrap_or_default(),
            request.version_id_marker.as_deref(),
            false,
        );
        if let Some(err) = state.take_fault(Operation::ListObjectVersions) {
            return Err(err);
        }

        let bucket = state.bucket(&request.bucket)?;
        let prefix = request.prefix.unwrap_or_default();

        let mut entries: Vec<&Entry> = bucket
            .entries
            .iter()
            .filter(|e| e.key.starts_with(&prefix))
            .filter(|e| match (&request.key_marker, &request.version_id_marker) {
                (Some(key), Some(version)) => {
                    e.key > *key || (e.key == *key && e.seq < marker_seq(version))
                }
                (Some(key), None) => e.key > *key,
                _ => true,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key).then(b.seq.cmp(&a.seq)));

        let max_keys = request
            .max_keys
            .map(|m| m.max(1) as usize)
            .unwrap_or(DEFAULT_MAX_KEYS);
        let is_truncated = entries.len() > max_keys;
        entries.truncate(max_keys);

        let mut page = ListVersionsPage {
            is_truncated,
            ..Default::default()
        };
        for entry in &entries {
            let version = ObjectVersion {
                bucket: request.bucket.clone(),
                key: entry.key.clone(),
                version_id: Some(entry.version_id.clone()),
                is_delete_marker: entry.is_delete_marker,
            };
            if entry.is_delete_marker {
                page.delete_markers.push(version);
            } else {
                page.versions.push(version);
            }
        }
        if is_truncated {
            if let Some(last) = entries.last() {
                page.next_key_marker = Some(last.key.clone());
                page.next_version_id_marker = Some(last.version_id.clone());
            }
        }

        Ok(page)
    }

    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<Option<ObjectMetadata>, StoreError> {
        let mut state = self.state.lock().await;
        state.calls.push(Call {
            op: Operation::HeadObject,
            key: request.key.clone(),
            version_id: request.version_id.clone(),
            bypass: false,
            checksum_mode: request.checksum_mode,
        });
        if let Some(err) = state.take_fault(Operation::HeadObject) {
            return Err(err);
        }

        let not_found = || StoreError::not_found(format!("Not Found: {}", request.key));
        let bucket = state.bucket(&request.bucket).map_err(|_| not_found())?;
        let entry = bucket
            .find(&request.key, request.version_id.as_deref())
            .ok_or_else(not_found)?;

        if entry.is_delete_marker {
            return match request.version_id {
                Some(_) => Err(StoreError::from_code(
                    "MethodNotAllowed",
                    "The specified method is not allowed against this resource.",
                )),
                None => Err(not_found()),
            };
        }

        if let Some(expected) = &request.if_match {
            if entry.metadata.etag.as_deref() != Some(expected.trim_matches('"')) {
                return Err(StoreError::not_found("Precondition Failed"));
            }
        }

        let mut metadata = entry.metadata.clone();
        if !request.checksum_mode {
            metadata.checksum_crc32 = None;
            metadata.checksum_crc32c = None;
            metadata.checksum_sha1 = None;
            metadata.checksum_sha256 = None;
        }
        Ok(Some(metadata))
    }

    async fn delete_object(&self, request: DeleteObjectRequest) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::DeleteObject,
            &request.key,
            request.version_id.as_deref(),
            request.bypass_governance_retention,
        );
        if let Some(err) = state.take_fault(Operation::DeleteObject) {
            return Err(err);
        }

        let seq = state.next_seq();
        let bucket = state.bucket(&request.bucket)?;
        if bucket.denied_keys.contains(&request.key) {
            return Err(StoreError::access_denied("Access Denied"));
        }

        match request.version_id.as_deref() {
            Some(version_id) => {
                let index = bucket
                    .entries
                    .iter()
                    .position(|e| e.key == request.key && e.version_id == version_id)
                    .ok_or_else(|| StoreError::no_such_key(&request.key))?;

                let entry = &bucket.entries[index];
                if !entry.is_delete_marker
                    && entry.is_locked(request.bypass_governance_retention, Utc::now())
                {
                    return Err(StoreError::access_denied(OBJECT_LOCK_DENIED));
                }
                bucket.entries.remove(index);
            }
            None if bucket.versioned => {
                let version_id = bucket.version_id(seq);
                bucket.entries.push(Entry {
                    key: request.key.clone(),
                    seq,
                    version_id,
                    is_delete_marker: true,
                    body: Bytes::new(),
                    metadata: ObjectMetadata::default(),
                    acl: None,
                    tags: HashMap::new(),
                });
            }
            None => {
                bucket.entries.retain(|e| e.key != request.key);
            }
        }

        Ok(())
    }

    async fn put_object_legal_hold(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        status: LegalHoldStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(Operation::PutObjectLegalHold, key, version_id, false);
        if let Some(err) = state.take_fault(Operation::PutObjectLegalHold) {
            return Err(err);
        }

        let entry = state
            .bucket(bucket)?
            .find_mut(key, version_id)
            .ok_or_else(|| StoreError::no_such_key(key))?;
        entry.metadata.retention.legal_hold = Some(status);
        Ok(())
    }

    async fn put_object_retention(&self, request: PutRetentionRequest) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::PutObjectRetention,
            &request.key,
            request.version_id.as_deref(),
            request.bypass_governance_retention,
        );
        if let Some(err) = state.take_fault(Operation::PutObjectRetention) {
            return Err(err);
        }

        let entry = state
            .bucket(&request.bucket)?
            .find_mut(&request.key, request.version_id.as_deref())
            .ok_or_else(|| StoreError::no_such_key(&request.key))?;

        let current = &entry.metadata.retention;
        let shortened = match (current.retain_until, request.retain_until) {
            (Some(old), Some(new)) => new < old,
            (Some(_), None) => true,
            _ => false,
        };
        if shortened {
            match current.mode {
                Some(RetentionMode::Compliance) => {
                    return Err(StoreError::access_denied(OBJECT_LOCK_DENIED))
                }
                Some(RetentionMode::Governance) if !request.bypass_governance_retention => {
                    return Err(StoreError::access_denied(OBJECT_LOCK_DENIED))
                }
                _ => {}
            }
        }

        entry.metadata.retention.mode = request.mode;
        entry.metadata.retention.retain_until = request.retain_until;
        Ok(())
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StoreError> {
        let mut state = self.state.lock().await;
        state.record(Operation::PutObject, &request.key, None, false);
        if let Some(err) = state.take_fault(Operation::PutObject) {
            return Err(err);
        }

        let seq = state.next_seq();
        let bucket = state.bucket(&request.bucket)?;
        let version_id = bucket.version_id(seq);
        let etag = format!("etag-{}", seq);

        let checksum = |algorithm| {
            (request.checksum_algorithm == Some(algorithm))
                .then(|| simulated_checksum(algorithm, &request.body))
        };

        let metadata = ObjectMetadata {
            etag: Some(etag.clone()),
            storage_class: ObjectMetadata::storage_class_or_default(
                request.storage_class.as_deref(),
            ),
            server_side_encryption: request.server_side_encryption.clone(),
            kms_key_id: request.kms_key_id.clone(),
            bucket_key_enabled: request.bucket_key_enabled.unwrap_or(false),
            cache_control: request.cache_control.clone(),
            content_disposition: request.content_disposition.clone(),
            content_encoding: request.content_encoding.clone(),
            content_language: request.content_language.clone(),
            content_type: Some(
                request
                    .content_type
                    .clone()
                    .unwrap_or_else(|| "binary/octet-stream".to_string()),
            ),
            checksum_crc32: checksum(ChecksumAlgorithm::Crc32),
            checksum_crc32c: checksum(ChecksumAlgorithm::Crc32c),
            checksum_sha1: checksum(ChecksumAlgorithm::Sha1),
            checksum_sha256: checksum(ChecksumAlgorithm::Sha256),
            metadata: request.metadata.clone().unwrap_or_default(),
            retention: RetentionState {
                legal_hold: request.object_lock_legal_hold_status,
                mode: request.object_lock_mode,
                retain_until: request.object_lock_retain_until_date,
            },
            version_id: bucket.versioned.then(|| version_id.clone()),
            website_redirect: request.website_redirect.clone(),
        };

        let tags = request
            .tagging
            .as_deref()
            .map(|query| {
                query
                    .split('&')
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(k, v)| {
                        (
                            urlencoding::decode(k).map(|s| s.into_owned()).unwrap_or_default(),
                            urlencoding::decode(v).map(|s| s.into_owned()).unwrap_or_default(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        if !bucket.versioned {
            bucket.entries.retain(|e| e.key != request.key);
        }
        bucket.entries.push(Entry {
            key: request.key.clone(),
            seq,
            version_id: version_id.clone(),
            is_delete_marker: false,
            body: request.body.clone(),
            metadata,
            acl: request.acl,
            tags,
        });

        Ok(PutObjectOutput {
            etag: Some(etag),
            version_id: bucket.versioned.then_some(version_id),
        })
    }

    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: CannedAcl,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(Operation::PutObjectAcl, key, None, false);
        if let Some(err) = state.take_fault(Operation::PutObjectAcl) {
            return Err(err);
        }

        let entry = state
            .bucket(bucket)?
            .find_mut(key, None)
            .ok_or_else(|| StoreError::no_such_key(key))?;
        entry.acl = Some(acl);
        Ok(())
    }

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<HashMap<String, String>, StoreError> {
        let mut state = self.state.lock().await;
        state.record(Operation::GetObjectTagging, key, None, false);
        if let Some(err) = state.take_fault(Operation::GetObjectTagging) {
            return Err(err);
        }

        state
            .bucket(bucket)?
            .find(key, None)
            .map(|e| e.tags.clone())
            .ok_or_else(|| StoreError::no_such_key(key))
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(Operation::PutObjectTagging, key, None, false);
        if let Some(err) = state.take_fault(Operation::PutObjectTagging) {
            return Err(err);
        }

        let entry = state
            .bucket(bucket)?
            .find_mut(key, None)
            .ok_or_else(|| StoreError::no_such_key(key))?;
        entry.tags = tags.clone();
        Ok(())
    }

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.record(Operation::DeleteObjectTagging, key, None, false);
        if let Some(err) = state.take_fault(Operation::DeleteObjectTagging) {
            return Err(err);
        }

        let entry = state
            .bucket(bucket)?
            .find_mut(key, None)
            .ok_or_else(|| StoreError::no_such_key(key))?;
        entry.tags.clear();
        Ok(())
    }
}
