pub mod deleter;
pub mod finder;
pub mod key;
pub mod lister;
pub mod model;
pub mod reconcile;
pub mod resource;
pub mod retention;
pub mod spec;
pub mod state;
pub mod tags;
pub mod upload;

pub use deleter::delete_object_version;
pub use finder::{find_object, find_object_version};
pub use key::{clean_key, parse_import_id, ImportId};
pub use lister::VersionLister;
pub use reconcile::{delete_all_versions, BulkReconciler, ReconciliationResult};
pub use resource::ObjectResource;
pub use retention::{clear_legal_hold, UnlockOutcome};
pub use spec::{ComputedChanges, ObjectSpec};
pub use state::ObjectState;
pub use tags::{ObjectTagStore, TagStore};
