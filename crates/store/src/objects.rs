use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use station_primitives::{Cid, Hash};

use crate::StoreError;

/// Everything the store holds: raw blob bytes or an immutable directory node.
///
/// The borsh encoding of this enum is the canonical form an object's cid is
/// derived from. `DirNode` keeps its entries in a `BTreeMap`, so two listings
/// with the same members encode identically regardless of insertion order.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum Object {
    Blob(Vec<u8>),
    Directory(DirNode),
}

impl Object {
    pub fn cid(&self) -> Result<Cid, StoreError> {
        Ok(Hash::hash_borsh(self)?.into())
    }

    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(borsh::to_vec(self)?)
    }

    pub fn decode(cid: Cid, bytes: &[u8]) -> Result<Self, StoreError> {
        borsh::from_slice(bytes).map_err(|_| StoreError::Corrupt(cid))
    }
}

#[derive(Clone, Debug, Default, BorshSerialize, BorshDeserialize)]
pub struct DirNode {
    entries: BTreeMap<String, DirEntry>,
}

impl DirNode {
    pub fn get(&self, name: &str) -> Option<&DirEntry> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: String, entry: DirEntry) {
        let _previous = self.entries.insert(name, entry);
    }

    pub fn remove(&mut self, name: &str) -> Option<DirEntry> {
        self.entries.remove(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DirEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct DirEntry {
    pub kind: EntryKind,
    pub cid: Cid,
    pub size: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, BorshSerialize, BorshDeserialize)]
pub enum EntryKind {
    File,
    Directory,
}
