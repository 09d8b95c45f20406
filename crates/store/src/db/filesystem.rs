use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use station_primitives::Cid;

use crate::db::Database;
use crate::StoreError;

/// One file per object, named by the cid's text form.
#[derive(Clone, Debug)]
pub struct FileSystemDb {
    root: Utf8PathBuf,
}

impl FileSystemDb {
    pub fn new(root: &Utf8Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root)?;

        Ok(Self {
            root: root.to_owned(),
        })
    }

    fn path(&self, cid: &Cid) -> Utf8PathBuf {
        self.root.join(cid.to_base58())
    }
}

impl Database for FileSystemDb {
    fn has(&self, cid: &Cid) -> Result<bool, StoreError> {
        Ok(self.path(cid).is_file())
    }

    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path(cid)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn put(&self, cid: &Cid, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path(cid);

        if path.is_file() {
            return Ok(());
        }

        // a partial write must never be visible under the final name
        let staged = path.with_extension("part");
        fs::write(&staged, bytes)?;
        fs::rename(&staged, &path)?;

        Ok(())
    }
}
