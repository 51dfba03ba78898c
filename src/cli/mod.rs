pub mod object;
pub mod versions;

use std::sync::Arc;

use rise_object::client::{AwsKmsKeyResolver, AwsObjectStore, ObjectStore};
use rise_object::object::{ObjectResource, ObjectTagStore};
use rise_object::Settings;

/// Clients shared by all subcommands
pub struct Context {
    pub store: Arc<dyn ObjectStore>,
    pub resource: ObjectResource,
}

impl Context {
    pub async fn from_settings(settings: &Settings) -> Self {
        let store: Arc<dyn ObjectStore> =
            Arc::new(AwsObjectStore::from_settings(&settings.aws).await);

        let tags = Arc::new(ObjectTagStore::new(
            store.clone(),
            settings.objects.default_tags.clone(),
            settings.objects.ignore_tag_prefixes.clone(),
        ));
        let kms = Arc::new(
            AwsKmsKeyResolver::from_settings(
                &settings.aws,
                settings.objects.default_kms_key_alias.clone(),
            )
            .await,
        );

        Self {
            resource: ObjectResource::new(store.clone(), tags, kms),
            store,
        }
    }
}
