pub mod bucket;
pub mod event;
pub mod snapshot;

pub use bucket::{BucketKey, DayBucket};
pub use event::{EventKind, EventPosition, VaultEvent};
pub use snapshot::{DerivedYields, VaultSnapshot};
