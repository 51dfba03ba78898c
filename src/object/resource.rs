use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{KmsKeyResolver, ObjectStore};
use crate::error::{ObjectError, StoreResultExt};
use crate::object::deleter::delete_object_version;
use crate::object::finder::find_object;
use crate::object::key::parse_import_id;
use crate::object::reconcile::BulkReconciler;
use crate::object::retention::{put_legal_hold, update_retention};
use crate::object::spec::ObjectSpec;
use crate::object::state::ObjectState;
use crate::object::tags::TagStore;
use crate::object::upload::build_put_request;

/// Create, read, update, delete and import of one managed object.
///
/// All collaborators are injected; the resource holds no state between calls.
pub struct ObjectResource {
    store: Arc<dyn ObjectStore>,
    tags: Arc<dyn TagStore>,
    kms: Arc<dyn KmsKeyResolver>,
}

impl ObjectResource {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        tags: Arc<dyn TagStore>,
        kms: Arc<dyn KmsKeyResolver>,
    ) -> Self {
        Self { store, tags, kms }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Upload a new object and return its observed state
    pub async fn create(&self, spec: &ObjectSpec) -> Result<ObjectState, ObjectError> {
        spec.validate()?;
        self.upload(spec).await?;

        self.read(spec, &spec.key, true)
            .await?
            .ok_or_else(|| ObjectError::EmptyResult {
                bucket: spec.bucket.clone(),
                key: spec.key.clone(),
            })
    }

    /// Read the remote state of `id`.
    ///
    /// `Ok(None)` means the object is gone; only an existing resource
    /// (`is_new == false`) may disappear without an error.
    pub async fn read(
        &self,
        spec: &ObjectSpec,
        id: &str,
        is_new: bool,
    ) -> Result<Option<ObjectState>, ObjectError> {
        let key = spec.clean_key();

        let metadata = match find_object(
            self.store.as_ref(),
            &spec.bucket,
            &key,
            None,
            spec.checksum_algorithm,
        )
        .await
        {
            Ok(metadata) => metadata,
            Err(err) if !is_new && err.is_not_found() => {
                warn!("S3 Object ({}) not found, removing from state", id);
                return Ok(None);
            }
            Err(err) => return Err(err.context(format!("reading S3 Object ({})", id))),
        };

        let mut state = ObjectState::from_metadata(id, &spec.bucket, &spec.key, &metadata);

        if let Some(kms_key_id) = &metadata.kms_key_id {
            let default_arn = self
                .kms
                .default_key_arn()
                .await
                .context("describing default S3 KMS key")?;
            if *kms_key_id != default_arn {
                debug!(
                    "S3 object is encrypted using a non-default KMS Key ID: {}",
                    kms_key_id
                );
                state.kms_key_id = kms_key_id.clone();
            }
        }

        state.tags = self.tags.list(&spec.bucket, &key).await?;

        Ok(Some(state))
    }

    /// Apply `new` over `old`, re-uploading when the content changed
    pub async fn update(
        &self,
        old: &ObjectSpec,
        new: &ObjectSpec,
        id: &str,
    ) -> Result<Option<ObjectState>, ObjectError> {
        new.validate()?;

        if new.content_changed(old) {
            self.upload(new).await?;
            return self.read(new, id, false).await;
        }

        let store = self.store.as_ref();
        let key = new.clean_key();

        if new.acl != old.acl {
            if let Some(acl) = new.acl {
                store
                    .put_object_acl(&new.bucket, &key, acl)
                    .await
                    .with_context(|| format!("putting S3 Object ({}) ACL", id))?;
            }
        }

        if new.object_lock_legal_hold_status != old.object_lock_legal_hold_status {
            if let Some(status) = new.object_lock_legal_hold_status {
                put_legal_hold(store, &new.bucket, &key, status).await?;
            }
        }

        if new.object_lock_mode != old.object_lock_mode
            || new.object_lock_retain_until_date != old.object_lock_retain_until_date
        {
            update_retention(
                store,
                &new.bucket,
                &key,
                new.object_lock_mode,
                old.retain_until().as_ref(),
                new.retain_until(),
            )
            .await?;
        }

        if new.tags != old.tags {
            self.tags
                .update(&new.bucket, &key, &old.tags, &new.tags)
                .await
                .map_err(|e| e.context("updating tags"))?;
        }

        self.read(new, id, false).await
    }

    /// Delete the object.
    ///
    /// With a tracked version every version and delete marker of the key is
    /// removed (lock protections overridden when `force_destroy` is set);
    /// otherwise a single unversioned delete is issued.
    pub async fn delete(&self, spec: &ObjectSpec, state: &ObjectState) -> Result<(), ObjectError> {
        let key = spec.clean_key();

        let result = if state.has_version() {
            BulkReconciler::new(self.store.as_ref(), &spec.bucket, Some(&key))
                .force(spec.force_destroy)
                .run()
                .await
                .into_result()
                .map(|deleted| {
                    info!(
                        "Deleted {} version(s) of S3 Bucket ({}) Object ({})",
                        deleted, spec.bucket, key
                    );
                })
        } else {
            delete_object_version(self.store.as_ref(), &spec.bucket, &key, None, false).await
        };

        result.map_err(|e| {
            e.context(format!(
                "deleting S3 Bucket ({}) Object ({})",
                spec.bucket, key
            ))
        })
    }

    /// Adopt an existing object from an import id (`bucket/key` or `s3://bucket/key`)
    pub async fn import(&self, id: &str) -> Result<(ObjectSpec, ObjectState), ObjectError> {
        let import = parse_import_id(id)?;
        let spec = ObjectSpec::new(import.bucket, import.key);

        let state = self
            .read(&spec, &spec.key, true)
            .await?
            .ok_or_else(|| ObjectError::EmptyResult {
                bucket: spec.bucket.clone(),
                key: spec.key.clone(),
            })?;

        Ok((spec, state))
    }

    async fn upload(&self, spec: &ObjectSpec) -> Result<(), ObjectError> {
        let tagging = self.tags.upload_tagging(&spec.tags);
        let request = build_put_request(spec, tagging).await?;
        let (bucket, key) = (request.bucket.clone(), request.key.clone());

        let output = self.store.put_object(request).await.with_context(|| {
            format!("uploading S3 Object ({}) to Bucket ({})", key, bucket)
        })?;

        info!(
            "Uploaded S3 Bucket ({}) Object ({}) Version ({})",
            bucket,
            key,
            output.version_id.unwrap_or_default()
        );
        Ok(())
    }
}
