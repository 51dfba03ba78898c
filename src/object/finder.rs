use crate::client::{HeadObjectRequest, ObjectStore};
use crate::error::{ErrorKind, ObjectError};
use crate::object::model::{ChecksumAlgorithm, ObjectMetadata};

/// Fetch the current metadata of one object.
///
/// With `etag` the request only matches that ETag; a mismatch is reported as
/// not found. With `checksum_algorithm` the stored checksums are returned.
pub async fn find_object(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    etag: Option<&str>,
    checksum_algorithm: Option<ChecksumAlgorithm>,
) -> Result<ObjectMetadata, ObjectError> {
    find(
        store,
        HeadObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: None,
            if_match: etag.filter(|e| !e.is_empty()).map(str::to_string),
            checksum_mode: checksum_algorithm.is_some(),
        },
    )
    .await
}

/// Fetch the metadata of one specific version
pub async fn find_object_version(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    version_id: Option<&str>,
) -> Result<ObjectMetadata, ObjectError> {
    find(
        store,
        HeadObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: version_id.map(str::to_string),
            ..Default::default()
        },
    )
    .await
}

async fn find(
    store: &dyn ObjectStore,
    request: HeadObjectRequest,
) -> Result<ObjectMetadata, ObjectError> {
    match store.head_object(request.clone()).await {
        Ok(Some(metadata)) => Ok(metadata),
        Ok(None) => Err(ObjectError::EmptyResult {
            bucket: request.bucket,
            key: request.key,
        }),
        Err(err) if err.kind == ErrorKind::NotFound => Err(ObjectError::NotFound {
            bucket: request.bucket,
            key: request.key,
            source: Some(err),
        }),
        Err(err) => Err(ObjectError::Store {
            context: format!(
                "reading S3 Bucket ({}) Object ({})",
                request.bucket, request.key
            ),
            source: err,
        }),
    }
}
