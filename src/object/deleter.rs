use tracing::{debug, info, warn};

use crate::client::{DeleteObjectRequest, ObjectStore};
use crate::error::ObjectError;

/// Delete one object version.
///
/// `force` requests the governance retention bypass. A missing bucket or key
/// counts as already deleted. Never retries.
pub async fn delete_object_version(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    version_id: Option<&str>,
    force: bool,
) -> Result<(), ObjectError> {
    let version = version_id.unwrap_or_default();
    info!(
        "Deleting S3 Bucket ({}) Object ({}) Version ({}), force: {}",
        bucket, key, version, force
    );

    let request = DeleteObjectRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        version_id: version_id.map(str::to_string),
        bypass_governance_retention: force,
    };

    match store.delete_object(request).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind.is_already_deleted() => {
            debug!(
                "S3 Bucket ({}) Object ({}) Version ({}) already deleted: {}",
                bucket, key, version, err
            );
            Ok(())
        }
        Err(err) => {
            warn!(
                "Failed to delete S3 Bucket ({}) Object ({}) Version ({}): {}",
                bucket, key, version, err
            );
            Err(ObjectError::Store {
                context: format!(
                    "deleting S3 Bucket ({}) Object ({}) Version ({})",
                    bucket, key, version
                ),
                source: err,
            })
        }
    }
}
