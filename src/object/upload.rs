use base64::Engine;
use bytes::Bytes;
use std::path::PathBuf;

use crate::client::PutObjectRequest;
use crate::error::ObjectError;
use crate::object::model::{ChecksumAlgorithm, ServerSideEncryption};
use crate::object::spec::ObjectSpec;

/// Where the body of an upload comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBody {
    /// Local file (home-relative paths already expanded)
    File(PathBuf),
    Content(String),
    /// Base64 text, decoded when read
    Base64(String),
    Empty,
}

impl ObjectBody {
    /// Pick the body source; `source` wins over `content`, which wins over `content_base64`
    pub fn from_spec(spec: &ObjectSpec) -> Result<Self, ObjectError> {
        if let Some(source) = &spec.source {
            return Ok(ObjectBody::File(expand_home(source)?));
        }
        if let Some(content) = &spec.content {
            return Ok(ObjectBody::Content(content.clone()));
        }
        if let Some(content) = &spec.content_base64 {
            return Ok(ObjectBody::Base64(content.clone()));
        }
        Ok(ObjectBody::Empty)
    }

    pub async fn read(&self) -> Result<Bytes, ObjectError> {
        match self {
            ObjectBody::File(path) => {
                let data = tokio::fs::read(path).await.map_err(|source| ObjectError::Io {
                    context: format!("opening S3 object source ({})", path.display()),
                    source,
                })?;
                Ok(Bytes::from(data))
            }
            ObjectBody::Content(content) => Ok(Bytes::from(content.clone())),
            ObjectBody::Base64(content) => {
                let data = base64::engine::general_purpose::STANDARD.decode(content)?;
                Ok(Bytes::from(data))
            }
            ObjectBody::Empty => Ok(Bytes::new()),
        }
    }
}

/// Expand a leading `~` to the current user's home directory
pub fn expand_home(path: &str) -> Result<PathBuf, ObjectError> {
    let rest = match path.strip_prefix('~') {
        Some(rest) => rest,
        None => return Ok(PathBuf::from(path)),
    };

    if !rest.is_empty() && !rest.starts_with('/') {
        return Err(ObjectError::invalid(format!(
            "expanding homedir in source ({}): cannot expand user-specific home dir",
            path
        )));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        ObjectError::invalid(format!(
            "expanding homedir in source ({}): home directory not found",
            path
        ))
    })?;

    Ok(home.join(rest.trim_start_matches('/')))
}

/// Build the put request for `spec`.
///
/// Only attributes that are set end up in the request. A `kms_key_id`
/// implies SSE-KMS unless an encryption is given explicitly. When any
/// object-lock parameter is present and no checksum algorithm is chosen,
/// CRC32 is used; the service rejects locked uploads without a checksum.
pub async fn build_put_request(
    spec: &ObjectSpec,
    tagging: Option<String>,
) -> Result<PutObjectRequest, ObjectError> {
    let body = ObjectBody::from_spec(spec)?.read().await?;

    let mut request = PutObjectRequest {
        bucket: spec.bucket.clone(),
        key: spec.clean_key(),
        body,
        acl: spec.acl,
        bucket_key_enabled: spec.bucket_key_enabled.then_some(true),
        cache_control: spec.cache_control.clone(),
        checksum_algorithm: spec.checksum_algorithm,
        content_disposition: spec.content_disposition.clone(),
        content_encoding: spec.content_encoding.clone(),
        content_language: spec.content_language.clone(),
        content_type: spec.content_type.clone(),
        metadata: (!spec.metadata.is_empty()).then(|| spec.metadata.clone()),
        object_lock_legal_hold_status: spec.object_lock_legal_hold_status,
        object_lock_mode: spec.object_lock_mode,
        object_lock_retain_until_date: spec.retain_until(),
        storage_class: spec.storage_class.clone(),
        tagging,
        website_redirect: spec.website_redirect.clone(),
        ..Default::default()
    };

    if let Some(kms_key_id) = &spec.kms_key_id {
        request.kms_key_id = Some(kms_key_id.clone());
        request.server_side_encryption = Some(ServerSideEncryption::AwsKms.as_str().to_string());
    }

    if let Some(sse) = spec.server_side_encryption {
        request.server_side_encryption = Some(sse.as_str().to_string());
    }

    if request.has_object_lock_parameters() && request.checksum_algorithm.is_none() {
        request.checksum_algorithm = Some(ChecksumAlgorithm::Crc32);
    }

    Ok(request)
}
