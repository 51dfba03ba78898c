use futures::StreamExt;
use tracing::{error, info};

use crate::client::ObjectStore;
use crate::error::{ErrorKind, ObjectError};
use crate::object::deleter::delete_object_version;
use crate::object::lister::VersionLister;
use crate::object::model::ObjectVersion;
use crate::object::retention::{clear_legal_hold, UnlockOutcome};

/// Outcome of a bulk deletion
#[derive(Debug, Default)]
pub struct ReconciliationResult {
    /// Versions and delete markers actually removed
    pub deleted: i64,
    pub error: Option<ObjectError>,
}

impl ReconciliationResult {
    pub fn into_result(self) -> Result<i64, ObjectError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.deleted),
        }
    }
}

/// Deletes every version and delete marker of a key (or of a whole bucket).
///
/// Versions are removed in a first listing pass, delete markers in a second.
/// A failing item never stops the scan; the last failure is reported once
/// the pass is complete.
///
/// With `force`, deletes bypass governance retention, and a version whose
/// delete is denied while its legal hold is on gets the hold cleared and is
/// retried once. Delete markers carry no lock and are never forced.
pub struct BulkReconciler<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    key: Option<&'a str>,
    force: bool,
    ignore_errors: bool,
    page_size: Option<i32>,
}

impl<'a> BulkReconciler<'a> {
    /// `key` of `None` (or empty) selects every object in the bucket
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, key: Option<&'a str>) -> Self {
        Self {
            store,
            bucket,
            key: key.filter(|k| !k.is_empty()),
            force: false,
            ignore_errors: false,
            page_size: None,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Continue past failed items and report success
    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn lister(&self) -> VersionLister<'a> {
        let lister = VersionLister::new(self.store, self.bucket, self.key);
        match self.page_size {
            Some(size) => lister.page_size(size),
            None => lister,
        }
    }

    fn selects(&self, version: &ObjectVersion) -> bool {
        self.key.map_or(true, |key| version.key == key)
    }

    pub async fn run(&self) -> ReconciliationResult {
        let mut deleted = 0;
        let mut last_error = None;

        let mut pages = self.lister().pages();
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(err) => return failed(deleted, err),
            };

            for version in page.versions.iter().filter(|v| self.selects(v)) {
                match self.delete_version(version).await {
                    Ok(()) => deleted += 1,
                    Err(err) => {
                        error!(
                            "Deleting S3 Bucket ({}) Object ({}) Version ({}): {}",
                            self.bucket,
                            version.key,
                            version.version_label(),
                            err
                        );
                        last_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = last_error.take() {
            if !self.ignore_errors {
                return failed(
                    deleted,
                    ObjectError::LastError {
                        context: "deleting at least one S3 Object version",
                        source: Box::new(err),
                    },
                );
            }
        }

        let mut pages = self.lister().pages();
        while let Some(page) = pages.next().await {
            let page = match page {
                Ok(page) => page,
                Err(err) => return failed(deleted, err),
            };

            for marker in page.delete_markers.iter().filter(|m| self.selects(m)) {
                let result = delete_object_version(
                    self.store,
                    self.bucket,
                    &marker.key,
                    marker.version_id.as_deref(),
                    false,
                )
                .await;

                match result {
                    Ok(()) => deleted += 1,
                    Err(err) => {
                        error!(
                            "Deleting S3 Bucket ({}) Object ({}) delete marker ({}): {}",
                            self.bucket,
                            marker.key,
                            marker.version_label(),
                            err
                        );
                        last_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = last_error {
            if !self.ignore_errors {
                return failed(
                    deleted,
                    ObjectError::LastError {
                        context: "deleting at least one S3 Object delete marker",
                        source: Box::new(err),
                    },
                );
            }
        }

        info!(
            "Deleted {} version(s) from S3 Bucket ({})",
            deleted, self.bucket
        );
        ReconciliationResult {
            deleted,
            error: None,
        }
    }

    async fn delete_version(&self, version: &ObjectVersion) -> Result<(), ObjectError> {
        let version_id = version.version_id.as_deref();

        let err = match delete_object_version(
            self.store,
            self.bucket,
            &version.key,
            version_id,
            self.force,
        )
        .await
        {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if !self.force || err.kind() != ErrorKind::AccessDenied {
            return Err(err);
        }

        // the hold is checked now, not at listing time; it may have changed since
        match clear_legal_hold(self.store, self.bucket, &version.key, version_id).await? {
            UnlockOutcome::Released => {
                delete_object_version(
                    self.store,
                    self.bucket,
                    &version.key,
                    version_id,
                    self.force,
                )
                .await
            }
            UnlockOutcome::NotHeld => Err(err),
        }
    }
}

fn failed(deleted: i64, err: ObjectError) -> ReconciliationResult {
    ReconciliationResult {
        deleted,
        error: Some(err),
    }
}

/// Delete all versions and delete markers of `key` (every key when `None`)
pub async fn delete_all_versions(
    store: &dyn ObjectStore,
    bucket: &str,
    key: Option<&str>,
    force: bool,
    ignore_errors: bool,
) -> ReconciliationResult {
    BulkReconciler::new(store, bucket, key)
        .force(force)
        .ignore_errors(ignore_errors)
        .run()
        .await
}
