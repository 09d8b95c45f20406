use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use station_primitives::Cid;

use crate::db::Database;
use crate::StoreError;

/// Ephemeral backend for tests and ad-hoc tooling.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDb {
    inner: Arc<RwLock<HashMap<Cid, Arc<[u8]>>>>,
}

impl InMemoryDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for InMemoryDb {
    fn has(&self, cid: &Cid) -> Result<bool, StoreError> {
        Ok(self.inner.read().contains_key(cid))
    }

    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.read().get(cid).map(|bytes| bytes.to_vec()))
    }

    fn put(&self, cid: &Cid, bytes: &[u8]) -> Result<(), StoreError> {
        let _previous = self.inner.write().entry(*cid).or_insert_with(|| bytes.into());

        Ok(())
    }
}
