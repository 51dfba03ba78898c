use futures::Stream;
use std::pin::Pin;
use tracing::debug;

use async_stream::stream;

use crate::client::{ListVersionsPage, ListVersionsRequest, ObjectStore};
use crate::error::{ErrorKind, ObjectError};
use crate::object::model::ObjectVersion;

/// Pages of a version listing. A fetch error is the last element.
pub type VersionPages<'a> =
    Pin<Box<dyn Stream<Item = Result<ListVersionsPage, ObjectError>> + Send + 'a>>;

/// Lists every version and delete marker under a bucket / key prefix.
///
/// Each call to [`pages`](Self::pages) starts a fresh listing from the first
/// page. A bucket that does not exist yields an empty listing.
#[derive(Clone, Copy)]
pub struct VersionLister<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
    prefix: Option<&'a str>,
    page_size: Option<i32>,
}

impl<'a> VersionLister<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, prefix: Option<&'a str>) -> Self {
        Self {
            store,
            bucket,
            prefix: prefix.filter(|p| !p.is_empty()),
            page_size: None,
        }
    }

    /// Limit the number of entries per page (service default otherwise)
    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn pages(&self) -> VersionPages<'a> {
        let store = self.store;
        let bucket = self.bucket;
        let prefix = self.prefix;
        let page_size = self.page_size;

        Box::pin(stream! {
            let mut key_marker: Option<String> = None;
            let mut version_id_marker: Option<String> = None;

            loop {
                let request = ListVersionsRequest {
                    bucket: bucket.to_string(),
                    prefix: prefix.map(str::to_string),
                    key_marker: key_marker.take(),
                    version_id_marker: version_id_marker.take(),
                    max_keys: page_size,
                };

                match store.list_object_versions(request).await {
                    Ok(page) => {
                        let truncated = page.is_truncated;
                        key_marker = page.next_key_marker.clone();
                        version_id_marker = page.next_version_id_marker.clone();
                        yield Ok(page);

                        // a truncated page without markers would restart the listing
                        if !truncated || (key_marker.is_none() && version_id_marker.is_none()) {
                            break;
                        }
                    }
                    Err(err) if err.kind == ErrorKind::NoSuchBucket => {
                        debug!("S3 Bucket ({}) not found, nothing to list", bucket);
                        break;
                    }
                    Err(err) => {
                        yield Err(ObjectError::Store {
                            context: format!("listing S3 Bucket ({}) Object versions", bucket),
                            source: err,
                        });
                        break;
                    }
                }
            }
        })
    }

    /// Drain the listing, returning everything gathered before any error
    pub async fn collect(&self) -> (Vec<ObjectVersion>, Option<ObjectError>) {
        use futures::StreamExt;

        let mut versions = Vec::new();
        let mut pages = self.pages();

        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => {
                    versions.extend(page.versions);
                    versions.extend(page.delete_markers);
                }
                Err(err) => return (versions, Some(err)),
            }
        }

        (versions, None)
    }
}
