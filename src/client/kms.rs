use async_trait::async_trait;
use aws_sdk_kms::Client as KmsClient;

use super::aws::{classify_sdk_error, load_sdk_config};
use crate::error::StoreError;
use crate::settings::AwsSettings;

/// Alias of the AWS managed key S3 uses for SSE-KMS when no key is given
pub const DEFAULT_S3_KMS_KEY_ALIAS: &str = "alias/aws/s3";

/// Resolves the account's default S3 KMS key.
///
/// Read only records a KMS key id when it differs from this default, so a
/// bucket-default encryption setup does not show up as drift.
#[async_trait]
pub trait KmsKeyResolver: Send + Sync {
    /// ARN of the default S3 KMS key
    async fn default_key_arn(&self) -> Result<String, StoreError>;
}

/// Resolves the default key through KMS DescribeKey
pub struct AwsKmsKeyResolver {
    client: KmsClient,
    alias: String,
}

impl AwsKmsKeyResolver {
    pub fn new(client: KmsClient, alias: impl Into<String>) -> Self {
        Self {
            client,
            alias: alias.into(),
        }
    }

    pub async fn from_settings(settings: &AwsSettings, alias: impl Into<String>) -> Self {
        let sdk_config = load_sdk_config(settings).await;
        Self::new(KmsClient::new(&sdk_config), alias)
    }
}

#[async_trait]
impl KmsKeyResolver for AwsKmsKeyResolver {
    async fn default_key_arn(&self) -> Result<String, StoreError> {
        let output = self
            .client
            .describe_key()
            .key_id(&self.alias)
            .send()
            .await
            .map_err(|e| classify_sdk_error(&e))?;

        output
            .key_metadata()
            .and_then(|m| m.arn())
            .map(str::to_string)
            .ok_or_else(|| StoreError::other(format!("KMS key ({}) has no ARN", self.alias)))
    }
}
