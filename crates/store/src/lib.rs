#[cfg(test)]
#[path = "tests/store.rs"]
mod tests;

use std::sync::Arc;

use station_primitives::Cid;
use thiserror::Error;

pub mod config;
pub mod db;
mod objects;

pub use config::StoreConfig;
pub use db::{Database, FileSystemDb, InMemoryDb};
pub use objects::{DirEntry, DirNode, EntryKind, Object};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: `{0}`")]
    NotFound(Cid),

    #[error("object is not a directory: `{0}`")]
    NotADirectory(Cid),

    #[error("object is not a blob: `{0}`")]
    NotABlob(Cid),

    #[error("undecodable object, the store may be corrupt: `{0}`")]
    Corrupt(Cid),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle over a content-addressed object store.
///
/// Cheap to clone; all clones share the same backing database. Directory
/// operations never mutate a stored node: `rm` and `cp` produce a new node
/// and return its cid, leaving the input node resolvable forever.
#[derive(Clone, Debug)]
pub struct ObjectStore {
    db: Arc<dyn Database>,
}

impl ObjectStore {
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDb::new()))
    }

    fn write(&self, object: &Object) -> Result<Cid, StoreError> {
        let cid = object.cid()?;

        if !self.db.has(&cid)? {
            self.db.put(&cid, &object.encode()?)?;
        }

        Ok(cid)
    }

    fn read(&self, cid: Cid) -> Result<Object, StoreError> {
        let Some(bytes) = self.db.get(&cid)? else {
            return Err(StoreError::NotFound(cid));
        };

        Object::decode(cid, &bytes)
    }

    fn read_dir(&self, cid: Cid) -> Result<DirNode, StoreError> {
        match self.read(cid)? {
            Object::Directory(node) => Ok(node),
            Object::Blob(_) => Err(StoreError::NotADirectory(cid)),
        }
    }

    /// Stores `bytes` as a blob and returns its cid.
    pub fn put(&self, bytes: &[u8]) -> Result<Cid, StoreError> {
        self.write(&Object::Blob(bytes.to_vec()))
    }

    /// Returns the bytes of a blob.
    pub fn get(&self, cid: Cid) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(bytes) = self.db.get(&cid)? else {
            return Ok(None);
        };

        match Object::decode(cid, &bytes)? {
            Object::Blob(bytes) => Ok(Some(bytes)),
            Object::Directory(_) => Err(StoreError::NotABlob(cid)),
        }
    }

    /// Stores the canonical empty directory node and returns its cid.
    pub fn add_directory(&self) -> Result<Cid, StoreError> {
        self.write(&Object::Directory(DirNode::default()))
    }

    /// The encoded size of an object, as recorded in directory entries.
    pub fn size_of(&self, cid: Cid) -> Result<u64, StoreError> {
        let Some(bytes) = self.db.get(&cid)? else {
            return Err(StoreError::NotFound(cid));
        };

        match Object::decode(cid, &bytes)? {
            Object::Blob(content) => Ok(content.len() as u64),
            Object::Directory(_) => Ok(bytes.len() as u64),
        }
    }

    /// Direct children of a directory: (name, entry) pairs in name order.
    pub fn ls(&self, cid: Cid) -> Result<Vec<(String, DirEntry)>, StoreError> {
        let node = self.read_dir(cid)?;

        Ok(node
            .entries()
            .map(|(name, entry)| (name.clone(), *entry))
            .collect())
    }

    /// Looks up a single name in a directory.
    pub fn lookup(&self, dir: Cid, name: &str) -> Result<Option<DirEntry>, StoreError> {
        Ok(self.read_dir(dir)?.get(name).copied())
    }

    /// Resolves a slash-separated path against a directory.
    ///
    /// Returns `None` on any unresolvable step; the empty path resolves to
    /// the directory itself.
    pub fn stat(&self, cid: Cid, path: &str) -> Result<Option<DirEntry>, StoreError> {
        let mut entry = DirEntry {
            kind: EntryKind::Directory,
            cid,
            size: self.size_of(cid)?,
        };

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if entry.kind != EntryKind::Directory {
                return Ok(None);
            }

            let Some(child) = self.lookup(entry.cid, segment)? else {
                return Ok(None);
            };

            entry = child;
        }

        Ok(Some(entry))
    }

    /// Produces a new directory node without `name`. A no-op (returning the
    /// input cid) when the name is absent.
    pub fn rm(&self, dir: Cid, name: &str) -> Result<Cid, StoreError> {
        let mut node = self.read_dir(dir)?;

        if node.remove(name).is_none() {
            return Ok(dir);
        }

        self.write(&Object::Directory(node))
    }

    /// Produces a new directory node with `name` linked to `child`.
    pub fn cp(
        &self,
        child: Cid,
        dir: Cid,
        name: &str,
        kind: EntryKind,
        size: u64,
    ) -> Result<Cid, StoreError> {
        let mut node = self.read_dir(dir)?;

        node.insert(
            name.to_owned(),
            DirEntry {
                kind,
                cid: child,
                size,
            },
        );

        self.write(&Object::Directory(node))
    }
}
