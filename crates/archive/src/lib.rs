#[cfg(test)]
#[path = "tests/tree.rs"]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use station_primitives::Cid;
use station_store::{EntryKind, ObjectStore, StoreError};
use thiserror::Error;
use tokio::sync::Mutex;

mod ingest;
mod root_file;

pub use ingest::{IngestReport, IngestedFile};
pub use root_file::{RootFile, ROOT_FILE};

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("tree is empty")]
    Empty,

    #[error("cannot remove root")]
    CannotRemoveRoot,

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A directory listing entry as surfaced to callers.
#[derive(Clone, Debug, Serialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub cid: Cid,
    pub size: u64,
}

/// The archive namespace: an immutable, copy-on-write directory tree over a
/// content-addressed store.
///
/// Every mutation produces a chain of new directory nodes from the touched
/// leaf up to a new root; untouched siblings are referenced unchanged and no
/// node that already exists is ever altered. Old roots therefore remain
/// resolvable forever.
///
/// The root handle is process-wide shared mutable state with a single-writer
/// discipline: every mutation holds the root mutex across its whole
/// read-modify-adopt cycle, so concurrent callers serialize instead of
/// racing.
#[derive(Clone, Debug)]
pub struct TreeManager {
    store: ObjectStore,
    root: Arc<Mutex<Option<Cid>>>,
}

impl TreeManager {
    #[must_use]
    pub fn new(store: ObjectStore) -> Self {
        Self {
            store,
            root: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// The current root, if any mutation or restore has produced one.
    pub async fn root(&self) -> Option<Cid> {
        *self.root.lock().await
    }

    /// Adopts a previously persisted root, skipping ingest replay.
    pub async fn set_root(&self, cid: Cid) {
        *self.root.lock().await = Some(cid);
    }

    /// The current root, creating an empty directory lazily when none exists.
    pub async fn get_or_create_root(&self) -> Result<Cid, TreeError> {
        let mut root = self.root.lock().await;

        if let Some(cid) = *root {
            return Ok(cid);
        }

        let empty = self.store.add_directory()?;
        *root = Some(empty);

        Ok(empty)
    }

    /// Stores `content` under `path`, producing and adopting a new root.
    pub async fn insert(&self, path: &str, content: &[u8]) -> Result<Cid, TreeError> {
        let segments = split_path(path);

        if segments.is_empty() {
            return Err(TreeError::InvalidPath(path.to_owned()));
        }

        let mut root = self.root.lock().await;

        let current = match *root {
            Some(cid) => cid,
            None => self.store.add_directory()?,
        };

        let new_root = self.insert_under(current, &segments, content)?;
        *root = Some(new_root);

        Ok(new_root)
    }

    /// Direct children of the directory at `path` (the root when empty).
    ///
    /// An unresolvable path is a normal outcome and yields an empty listing.
    pub async fn list(&self, path: &str) -> Result<Vec<TreeEntry>, TreeError> {
        let Some(current) = self.root().await else {
            return Ok(Vec::new());
        };

        let Some(target) = self.store.stat(current, path)? else {
            return Ok(Vec::new());
        };

        if target.kind != EntryKind::Directory {
            return Ok(Vec::new());
        }

        let entries = self
            .store
            .ls(target.cid)?
            .into_iter()
            .map(|(name, entry)| TreeEntry {
                name,
                kind: entry.kind,
                cid: entry.cid,
                size: entry.size,
            })
            .collect();

        Ok(entries)
    }

    /// Unlinks the entry at `path`, producing and adopting a new root.
    pub async fn remove(&self, path: &str) -> Result<Cid, TreeError> {
        let segments = split_path(path);

        let mut root = self.root.lock().await;

        let Some(current) = *root else {
            return Err(TreeError::Empty);
        };

        if segments.is_empty() {
            return Err(TreeError::CannotRemoveRoot);
        }

        let new_root = self.remove_under(current, &segments)?;
        *root = Some(new_root);

        Ok(new_root)
    }

    fn insert_under(
        &self,
        root: Cid,
        segments: &[&str],
        content: &[u8],
    ) -> Result<Cid, TreeError> {
        let Some((leaf, ancestors)) = segments.split_last() else {
            return Err(TreeError::InvalidPath(segments.join("/")));
        };

        // descend, lazily creating missing levels; depth is bounded by the
        // fixed path convention
        let mut parents = Vec::with_capacity(ancestors.len());
        let mut cursor = root;

        for name in ancestors {
            parents.push(cursor);

            cursor = match self.store.lookup(cursor, name)? {
                Some(entry) if entry.kind == EntryKind::Directory => entry.cid,
                _ => self.store.add_directory()?,
            };
        }

        let blob = self.store.put(content)?;
        let pruned = self.store.rm(cursor, leaf)?;
        let updated = self
            .store
            .cp(blob, pruned, leaf, EntryKind::File, content.len() as u64)?;

        self.relink_ancestors(updated, &parents, ancestors)
    }

    fn remove_under(&self, root: Cid, segments: &[&str]) -> Result<Cid, TreeError> {
        let Some((leaf, ancestors)) = segments.split_last() else {
            return Err(TreeError::CannotRemoveRoot);
        };

        let mut parents = Vec::with_capacity(ancestors.len());
        let mut cursor = root;

        for name in ancestors {
            parents.push(cursor);

            let Some(entry) = self.store.lookup(cursor, name)? else {
                return Err(TreeError::PathNotFound((*name).to_owned()));
            };

            if entry.kind != EntryKind::Directory {
                return Err(TreeError::PathNotFound((*name).to_owned()));
            }

            cursor = entry.cid;
        }

        if self.store.lookup(cursor, leaf)?.is_none() {
            return Err(TreeError::PathNotFound((*leaf).to_owned()));
        }

        let updated = self.store.rm(cursor, leaf)?;

        self.relink_ancestors(updated, &parents, ancestors)
    }

    /// Walks back toward the root: per ancestor level, remove the old
    /// same-named entry and re-link the updated child, producing a new node.
    fn relink_ancestors(
        &self,
        mut updated: Cid,
        parents: &[Cid],
        names: &[&str],
    ) -> Result<Cid, TreeError> {
        for (dir, name) in parents.iter().zip(names.iter()).rev() {
            let size = self.store.size_of(updated)?;
            let pruned = self.store.rm(*dir, name)?;

            updated = self
                .store
                .cp(updated, pruned, name, EntryKind::Directory, size)?;
        }

        Ok(updated)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
