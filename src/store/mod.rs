pub mod memory;
pub mod snapshot;
pub mod table;

pub use memory::Store;
pub use snapshot::{SnapshotMetadata, StoreSnapshot, SNAPSHOT_VERSION};
pub use table::{Record, Table};
