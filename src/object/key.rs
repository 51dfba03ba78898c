use regex::Regex;

use crate::error::ObjectError;

lazy_static::lazy_static! {
    static ref REPEATED_SLASHES: Regex = Regex::new(r"/+").unwrap();
}

/// Normalise an object key the way the service's URI cleaning does.
///
/// Leading slashes are dropped and runs of slashes collapse to one.
pub fn clean_key(key: &str) -> String {
    REPEATED_SLASHES
        .replace_all(key.trim_start_matches('/'), "/")
        .into_owned()
}

/// Bucket and key of an imported object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub bucket: String,
    pub key: String,
}

/// Parse `<bucket>/<key>` or `s3://<bucket>/<key>`. The key may contain `/`.
pub fn parse_import_id(id: &str) -> Result<ImportId, ObjectError> {
    let trimmed = id.strip_prefix("s3://").unwrap_or(id);

    match trimmed.split_once('/') {
        Some((bucket, key)) => Ok(ImportId {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }),
        None => Err(ObjectError::invalid(format!(
            "id {} should be in format <bucket>/<key> or s3://<bucket>/<key>",
            trimmed
        ))),
    }
}
