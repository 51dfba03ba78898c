use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::client::{ObjectStore, PutRetentionRequest};
use crate::error::{ObjectError, StoreResultExt};
use crate::object::finder::find_object_version;
use crate::object::model::{LegalHoldStatus, RetentionMode};

/// Result of [`clear_legal_hold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The hold was on and has been switched off
    Released,
    /// No hold was active; nothing was changed
    NotHeld,
}

/// Switch off the legal hold of one version if it is on.
///
/// Reads the version's current lock state first, so the decision reflects the
/// state at call time rather than at listing time.
pub async fn clear_legal_hold(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    version_id: Option<&str>,
) -> Result<UnlockOutcome, ObjectError> {
    let version = version_id.unwrap_or_default();

    let metadata = find_object_version(store, bucket, key, version_id)
        .await
        .map_err(|err| {
            error!(
                "Getting S3 Bucket ({}) Object ({}) Version ({}) metadata: {}",
                bucket, key, version, err
            );
            err
        })?;

    if !metadata.retention.legal_hold_active() {
        return Ok(UnlockOutcome::NotHeld);
    }

    info!(
        "Removing legal hold from S3 Bucket ({}) Object ({}) Version ({})",
        bucket, key, version
    );
    store
        .put_object_legal_hold(bucket, key, version_id, LegalHoldStatus::Off)
        .await
        .map_err(|err| {
            error!(
                "Putting S3 Bucket ({}) Object ({}) Version ({}) legal hold: {}",
                bucket, key, version, err
            );
            err
        })
        .with_context(|| {
            format!(
                "putting S3 Bucket ({}) Object ({}) Version ({}) legal hold",
                bucket, key, version
            )
        })?;

    Ok(UnlockOutcome::Released)
}

/// Set the legal hold of the current version
pub async fn put_legal_hold(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    status: LegalHoldStatus,
) -> Result<(), ObjectError> {
    store
        .put_object_legal_hold(bucket, key, None, status)
        .await
        .with_context(|| format!("putting S3 Object ({}) legal hold", key))
}

/// Whether moving the retain-until date from `old` to `new` shortens retention.
///
/// Clearing the date or moving it earlier needs the governance bypass.
pub fn retention_lowered(old: Option<&DateTime<Utc>>, new: Option<&DateTime<Utc>>) -> bool {
    match (old, new) {
        (_, None) => true,
        (Some(old), Some(new)) => new < old,
        (None, Some(_)) => false,
    }
}

/// Replace the retention of the current version
pub async fn update_retention(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    mode: Option<RetentionMode>,
    old_retain_until: Option<&DateTime<Utc>>,
    retain_until: Option<DateTime<Utc>>,
) -> Result<(), ObjectError> {
    let bypass = old_retain_until != retain_until.as_ref()
        && retention_lowered(old_retain_until, retain_until.as_ref());

    store
        .put_object_retention(PutRetentionRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            version_id: None,
            mode,
            retain_until,
            bypass_governance_retention: bypass,
        })
        .await
        .with_context(|| format!("putting S3 Object ({}) retention", key))
}
