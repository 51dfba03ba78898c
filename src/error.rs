use thiserror::Error;

/// Classification of a failed object-store interaction.
///
/// Produced once by the client layer so the deletion and read paths can branch
/// on it exhaustively instead of matching vendor error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Object absent, or a conditional (If-Match) read did not match
    NotFound,
    /// The call succeeded but returned no payload
    EmptyResult,
    /// Authorization failure (may be caused by object lock)
    AccessDenied,
    /// The bucket does not exist
    NoSuchBucket,
    /// The key (or key version) does not exist
    NoSuchKey,
    /// Network, throttling or any other service failure
    Other,
}

impl ErrorKind {
    /// Map an S3 error code to a kind
    pub fn from_code(code: &str) -> Self {
        match code {
            "AccessDenied" => ErrorKind::AccessDenied,
            "NoSuchBucket" => ErrorKind::NoSuchBucket,
            "NoSuchKey" | "NoSuchVersion" => ErrorKind::NoSuchKey,
            "NotFound" => ErrorKind::NotFound,
            _ => ErrorKind::Other,
        }
    }

    /// Delete paths treat a missing bucket or key as already deleted
    pub fn is_already_deleted(self) -> bool {
        matches!(self, ErrorKind::NoSuchBucket | ErrorKind::NoSuchKey)
    }
}

/// Error returned by an [`ObjectStore`](crate::client::ObjectStore) call.
#[derive(Debug, Clone, Error)]
#[error("{}", self.describe())]
pub struct StoreError {
    pub kind: ErrorKind,
    /// Vendor error code, e.g. "AccessDenied"
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: ErrorKind, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// Build an error from a vendor code, classifying it
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::from_code(code), Some(code.to_string()), message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::from_code("AccessDenied", message)
    }

    pub fn no_such_bucket(bucket: &str) -> Self {
        Self::from_code(
            "NoSuchBucket",
            format!("The specified bucket does not exist: {}", bucket),
        )
    }

    pub fn no_such_key(key: &str) -> Self {
        Self::from_code("NoSuchKey", format!("The specified key does not exist: {}", key))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, None, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, None, message)
    }

    fn describe(&self) -> String {
        match &self.code {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

/// Errors raised by the object lifecycle operations.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// A store call failed; `context` names the operation
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("S3 Bucket ({bucket}) Object ({key}) not found")]
    NotFound {
        bucket: String,
        key: String,
        #[source]
        source: Option<StoreError>,
    },

    #[error("reading S3 Bucket ({bucket}) Object ({key}): empty result")]
    EmptyResult { bucket: String, key: String },

    /// Aggregated failure of a bulk deletion, naming the last item error
    #[error("{context}, last error: {source}")]
    LastError {
        context: &'static str,
        #[source]
        source: Box<ObjectError>,
    },

    /// A lifecycle step failed; `context` names the step
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ObjectError>,
    },

    #[error("invalid object configuration: {0}")]
    Invalid(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding content_base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl ObjectError {
    /// Classify this error; wrapped errors report the kind of their cause
    pub fn kind(&self) -> ErrorKind {
        match self {
            ObjectError::Store { source, .. } => source.kind,
            ObjectError::NotFound { .. } => ErrorKind::NotFound,
            ObjectError::EmptyResult { .. } => ErrorKind::EmptyResult,
            ObjectError::LastError { source, .. } | ObjectError::Context { source, .. } => {
                source.kind()
            }
            ObjectError::Invalid(_) | ObjectError::Io { .. } | ObjectError::Base64(_) => {
                ErrorKind::Other
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ObjectError::Invalid(message.into())
    }

    /// Wrap with the name of the failed step
    pub fn context(self, context: impl Into<String>) -> Self {
        ObjectError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Attach operation context to store results.
///
/// ```rust,ignore
/// store.delete_object(request).await.context(format!("deleting {}", key))?;
/// ```
pub trait StoreResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T, ObjectError>;

    fn with_context<F, S>(self, f: F) -> Result<T, ObjectError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn context(self, context: impl Into<String>) -> Result<T, ObjectError> {
        self.map_err(|source| ObjectError::Store {
            context: context.into(),
            source,
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T, ObjectError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| ObjectError::Store {
            context: f().into(),
            source,
        })
    }
}
