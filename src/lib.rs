//! Lifecycle management for S3 objects in versioned, object-lock enabled buckets.
//!
//! The [`object`] module holds the lifecycle operations (version listing,
//! lock-aware deletion, bulk reconciliation, metadata lookup and uploads);
//! [`client`] is the object-store abstraction they run against.

pub mod client;
pub mod error;
pub mod object;
pub mod settings;

pub use error::{ErrorKind, ObjectError, StoreError};
pub use settings::Settings;
