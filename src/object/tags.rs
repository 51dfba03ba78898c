use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::client::ObjectStore;
use crate::error::{ObjectError, StoreResultExt};

/// Tag prefix reserved by the service
pub const AWS_TAG_PREFIX: &str = "aws:";

/// Reads and writes the tags of an object
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Tags of the current version, without ignored keys
    async fn list(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>, ObjectError>;

    /// Replace the managed tags `old` with `new`
    async fn update(
        &self,
        bucket: &str,
        key: &str,
        old: &HashMap<String, String>,
        new: &HashMap<String, String>,
    ) -> Result<(), ObjectError>;

    /// URL-encoded tag set to send with an upload, `None` when empty
    fn upload_tagging(&self, tags: &HashMap<String, String>) -> Option<String>;
}

/// [`TagStore`] over the object tagging calls of an [`ObjectStore`].
///
/// Default tags are merged under the resource's own tags; keys with an
/// ignored prefix are never read back or written.
pub struct ObjectTagStore {
    store: Arc<dyn ObjectStore>,
    default_tags: HashMap<String, String>,
    ignored_prefixes: Vec<String>,
}

impl ObjectTagStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        default_tags: HashMap<String, String>,
        ignored_prefixes: Vec<String>,
    ) -> Self {
        Self {
            store,
            default_tags,
            ignored_prefixes,
        }
    }

    fn ignored(&self, key: &str) -> bool {
        self.ignored_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    fn without_ignored(&self, tags: &HashMap<String, String>) -> HashMap<String, String> {
        tags.iter()
            .filter(|(k, _)| !self.ignored(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Default tags overlaid with the resource's tags
    pub fn merged(&self, tags: &HashMap<String, String>) -> HashMap<String, String> {
        let mut merged = self.default_tags.clone();
        merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.without_ignored(&merged)
    }
}

/// Encode tags as `k1=v1&k2=v2`, ordered by key
pub fn url_encode_tags(tags: &HashMap<String, String>) -> String {
    let sorted: BTreeMap<_, _> = tags.iter().collect();
    sorted
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl TagStore for ObjectTagStore {
    async fn list(&self, bucket: &str, key: &str) -> Result<HashMap<String, String>, ObjectError> {
        let tags = self
            .store
            .get_object_tagging(bucket, key)
            .await
            .with_context(|| format!("listing tags for S3 Bucket ({}) Object ({})", bucket, key))?;

        Ok(self.without_ignored(&tags))
    }

    async fn update(
        &self,
        bucket: &str,
        key: &str,
        old: &HashMap<String, String>,
        new: &HashMap<String, String>,
    ) -> Result<(), ObjectError> {
        let old = self.merged(old);
        let new = self.merged(new);
        if old == new {
            return Ok(());
        }

        // the service replaces the whole set, so keep the tags we do not manage
        let current = self
            .store
            .get_object_tagging(bucket, key)
            .await
            .with_context(|| format!("listing tags for S3 Bucket ({}) Object ({})", bucket, key))?;
        let mut tags: HashMap<String, String> = current
            .into_iter()
            .filter(|(k, _)| self.ignored(k))
            .collect();
        tags.extend(new);

        if tags.is_empty() {
            debug!("Removing all tags from S3 Bucket ({}) Object ({})", bucket, key);
            return self
                .store
                .delete_object_tagging(bucket, key)
                .await
                .with_context(|| {
                    format!("deleting tags for S3 Bucket ({}) Object ({})", bucket, key)
                });
        }

        debug!(
            "Updating {} tag(s) on S3 Bucket ({}) Object ({})",
            tags.len(),
            bucket,
            key
        );
        self.store
            .put_object_tagging(bucket, key, &tags)
            .await
            .with_context(|| format!("updating tags for S3 Bucket ({}) Object ({})", bucket, key))
    }

    fn upload_tagging(&self, tags: &HashMap<String, String>) -> Option<String> {
        let merged = self.merged(tags);
        if merged.is_empty() {
            None
        } else {
            Some(url_encode_tags(&merged))
        }
    }
}
