use station_primitives::Cid;

use crate::StoreError;

mod filesystem;
mod memory;

pub use filesystem::FileSystemDb;
pub use memory::InMemoryDb;

/// Keyed object storage. Objects are immutable: a cid is only ever written
/// once, and a second `put` of the same cid is a no-op.
pub trait Database: std::fmt::Debug + Send + Sync + 'static {
    fn has(&self, cid: &Cid) -> Result<bool, StoreError>;

    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, cid: &Cid, bytes: &[u8]) -> Result<(), StoreError>;
}
