use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::types::{
    ChecksumAlgorithm as AwsChecksumAlgorithm, ChecksumMode, ObjectCannedAcl, ObjectLockLegalHold,
    ObjectLockLegalHoldStatus, ObjectLockMode, ObjectLockRetention, ObjectLockRetentionMode,
    ServerSideEncryption, StorageClass, Tag, Tagging,
};
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::{
    DeleteObjectRequest, HeadObjectRequest, ListVersionsPage, ListVersionsRequest, ObjectStore,
    PutObjectOutput, PutObjectRequest, PutRetentionRequest,
};
use crate::error::{ErrorKind, StoreError};
use crate::object::model::{
    CannedAcl, LegalHoldStatus, ObjectMetadata, ObjectVersion, RetentionMode, RetentionState,
};
use crate::settings::AwsSettings;

/// Load the shared SDK configuration
///
/// Static credentials are only used when both halves are configured; otherwise
/// the default credential chain (env vars, profile, IRSA, instance profile) applies.
pub async fn load_sdk_config(settings: &AwsSettings) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &settings.region {
        loader = loader.region(aws_config::Region::new(region.clone()));
    }

    if let (Some(access_key), Some(secret_key)) =
        (&settings.access_key_id, &settings.secret_access_key)
    {
        let creds =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "static");
        loader = loader.credentials_provider(creds);
    }

    loader.load().await
}

/// Classify an SDK error into a [`StoreError`]
///
/// Service errors are classified by their S3 error code. Responses without a
/// code (HEAD requests carry no body) fall back to the HTTP status.
pub(crate) fn classify_sdk_error<E>(err: &SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let service_err = err.as_service_error();
    let code = service_err.and_then(|e| e.code());
    let message = service_err
        .and_then(|e| e.message())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(err).to_string());

    match (code, status) {
        (Some(code), _) => StoreError::from_code(code, message),
        (None, Some(403)) => StoreError::access_denied(message),
        (None, Some(404)) => StoreError::not_found(message),
        _ => StoreError::other(message),
    }
}

fn to_aws_date(value: &DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs_and_nanos(value.timestamp(), value.timestamp_subsec_nanos())
}

fn from_aws_date(value: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value.secs(), value.subsec_nanos())
}

fn legal_hold_from_aws(status: &ObjectLockLegalHoldStatus) -> Option<LegalHoldStatus> {
    match status {
        ObjectLockLegalHoldStatus::On => Some(LegalHoldStatus::On),
        ObjectLockLegalHoldStatus::Off => Some(LegalHoldStatus::Off),
        _ => None,
    }
}

fn lock_mode_from_aws(mode: &ObjectLockMode) -> Option<RetentionMode> {
    match mode {
        ObjectLockMode::Governance => Some(RetentionMode::Governance),
        ObjectLockMode::Compliance => Some(RetentionMode::Compliance),
        _ => None,
    }
}

fn none_if_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// [`ObjectStore`] backed by the AWS SDK for S3
#[derive(Clone)]
pub struct AwsObjectStore {
    client: S3Client,
}

impl AwsObjectStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Build a store from settings, honouring a custom endpoint (MinIO, LocalStack, ...)
    pub async fn from_settings(settings: &AwsSettings) -> Self {
        let sdk_config = load_sdk_config(settings).await;
        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(settings.force_path_style);

        if let Some(endpoint) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(S3Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn list_object_versions(
        &self,
        request: ListVersionsRequest,
    ) -> Result<ListVersionsPage, StoreError> {
        let bucket = request.bucket.clone();
        let output = self
            .client
            .list_object_versions()
            .bucket(&request.bucket)
            .set_prefix(request.prefix)
            .set_key_marker(request.key_marker)
            .set_version_id_marker(request.version_id_marker)
            .set_max_keys(request.max_keys)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        let versions = output
            .versions()
            .iter()
            .map(|v| {
                ObjectVersion::version(
                    &bucket,
                    v.key().unwrap_or_default(),
                    none_if_empty(v.version_id()),
                )
            })
            .collect();

        let delete_markers = output
            .delete_markers()
            .iter()
            .map(|m| {
                ObjectVersion::delete_marker(
                    &bucket,
                    m.key().unwrap_or_default(),
                    none_if_empty(m.version_id()),
                )
            })
            .collect();

        Ok(ListVersionsPage {
            versions,
            delete_markers,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_key_marker: output.next_key_marker().map(str::to_string),
            next_version_id_marker: output.next_version_id_marker().map(str::to_string),
        })
    }

    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<Option<ObjectMetadata>, StoreError> {
        let mut call = self
            .client
            .head_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id)
            .set_if_match(request.if_match);

        if request.checksum_mode {
            call = call.checksum_mode(ChecksumMode::Enabled);
        }

        let output = match call.send().await {
            Ok(output) => output,
            Err(err) => {
                let mut store_err = classify_sdk_error(&err);
                // 412 is returned when If-Match does not match the current ETag
                if matches!(err.raw_response().map(|r| r.status().as_u16()), Some(404 | 412)) {
                    store_err.kind = ErrorKind::NotFound;
                }
                return Err(store_err);
            }
        };

        let retention = RetentionState {
            legal_hold: output
                .object_lock_legal_hold_status()
                .and_then(legal_hold_from_aws),
            mode: output.object_lock_mode().and_then(lock_mode_from_aws),
            retain_until: output
                .object_lock_retain_until_date()
                .and_then(from_aws_date),
        };

        Ok(Some(ObjectMetadata {
            etag: ObjectMetadata::clean_etag(output.e_tag()),
            storage_class: ObjectMetadata::storage_class_or_default(
                output.storage_class().map(|c| c.as_str()),
            ),
            server_side_encryption: output
                .server_side_encryption()
                .map(|s| s.as_str().to_string()),
            kms_key_id: output.ssekms_key_id().map(str::to_string),
            bucket_key_enabled: output.bucket_key_enabled().unwrap_or(false),
            cache_control: output.cache_control().map(str::to_string),
            content_disposition: output.content_disposition().map(str::to_string),
            content_encoding: output.content_encoding().map(str::to_string),
            content_language: output.content_language().map(str::to_string),
            content_type: output.content_type().map(str::to_string),
            checksum_crc32: output.checksum_crc32().map(str::to_string),
            checksum_crc32c: output.checksum_crc32_c().map(str::to_string),
            checksum_sha1: output.checksum_sha1().map(str::to_string),
            checksum_sha256: output.checksum_sha256().map(str::to_string),
            metadata: output.metadata().cloned().unwrap_or_default(),
            retention,
            version_id: output.version_id().map(str::to_string),
            website_redirect: output.website_redirect_location().map(str::to_string),
        }))
    }

    async fn delete_object(&self, request: DeleteObjectRequest) -> Result<(), StoreError> {
        let mut call = self
            .client
            .delete_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id);

        if request.bypass_governance_retention {
            call = call.bypass_governance_retention(true);
        }

        call.send().await.map_err(|e| classify_sdk_error(&e))?;
        Ok(())
    }

    async fn put_object_legal_hold(
        &self,
        bucket: &str,
        key: &str,
        version_id: Option<&str>,
        status: LegalHoldStatus,
    ) -> Result<(), StoreError> {
        let legal_hold = ObjectLockLegalHold::builder()
            .status(ObjectLockLegalHoldStatus::from(status.as_str()))
            .build();

        self.client
            .put_object_legal_hold()
            .bucket(bucket)
            .key(key)
            .set_version_id(version_id.map(str::to_string))
            .legal_hold(legal_hold)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(())
    }

    async fn put_object_retention(&self, request: PutRetentionRequest) -> Result<(), StoreError> {
        let retention = ObjectLockRetention::builder()
            .set_mode(
                request
                    .mode
                    .map(|m| ObjectLockRetentionMode::from(m.as_str())),
            )
            .set_retain_until_date(request.retain_until.as_ref().map(to_aws_date))
            .build();

        let mut call = self
            .client
            .put_object_retention()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_version_id(request.version_id)
            .retention(retention);

        if request.bypass_governance_retention {
            call = call.bypass_governance_retention(true);
        }

        call.send().await.map_err(|e| classify_sdk_error(&e))?;
        Ok(())
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, StoreError> {
        debug!(
            "Putting S3 Bucket ({}) Object ({}), {} bytes",
            request.bucket,
            request.key,
            request.body.len()
        );

        let output = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .set_acl(request.acl.map(|a| ObjectCannedAcl::from(a.as_str())))
            .set_bucket_key_enabled(request.bucket_key_enabled)
            .set_cache_control(request.cache_control)
            .set_checksum_algorithm(
                request
                    .checksum_algorithm
                    .map(|c| AwsChecksumAlgorithm::from(c.as_str())),
            )
            .set_content_disposition(request.content_disposition)
            .set_content_encoding(request.content_encoding)
            .set_content_language(request.content_language)
            .set_content_type(request.content_type)
            .set_ssekms_key_id(request.kms_key_id)
            .set_metadata(request.metadata)
            .set_object_lock_legal_hold_status(
                request
                    .object_lock_legal_hold_status
                    .map(|s| ObjectLockLegalHoldStatus::from(s.as_str())),
            )
            .set_object_lock_mode(
                request
                    .object_lock_mode
                    .map(|m| ObjectLockMode::from(m.as_str())),
            )
            .set_object_lock_retain_until_date(
                request.object_lock_retain_until_date.as_ref().map(to_aws_date),
            )
            .set_server_side_encryption(
                request
                    .server_side_encryption
                    .as_deref()
                    .map(ServerSideEncryption::from),
            )
            .set_storage_class(request.storage_class.as_deref().map(StorageClass::from))
            .set_tagging(request.tagging)
            .set_website_redirect_location(request.website_redirect)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(PutObjectOutput {
            etag: ObjectMetadata::clean_etag(output.e_tag()),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn put_object_acl(
        &self,
        bucket: &str,
        key: &str,
        acl: CannedAcl,
    ) -> Result<(), StoreError> {
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(())
    }

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<HashMap<String, String>, StoreError> {
        let output = self
            .client
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(output
            .tag_set()
            .iter()
            .map(|t| (t.key().to_string(), t.value().to_string()))
            .collect())
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut tag_set = Vec::with_capacity(tags.len());
        for (k, v) in tags {
            let tag = Tag::builder()
                .key(k)
                .value(v)
                .build()
                .map_err(|e| StoreError::other(format!("building tag {}: {}", k, e)))?;
            tag_set.push(tag);
        }

        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| StoreError::other(format!("building tag set: {}", e)))?;

        self.client
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(())
    }

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        Ok(())
    }
}
