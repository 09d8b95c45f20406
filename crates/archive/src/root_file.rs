use camino::Utf8Path;
use eyre::{Result as EyreResult, WrapErr};
use serde::{Deserialize, Serialize};
use station_primitives::Cid;
use tracing::warn;

/// The sole durable record of the archive namespace's current root,
/// independent of any naming-service publication.
pub const ROOT_FILE: &str = "archive_root.json";

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RootFile {
    pub root: Cid,
}

impl RootFile {
    /// Reads the persisted root. A missing or undecodable file is treated as
    /// "no prior state", not an error.
    #[must_use]
    pub fn load(dir: &Utf8Path) -> Option<Cid> {
        let path = dir.join(ROOT_FILE);

        let content = std::fs::read_to_string(&path).ok()?;

        match serde_json::from_str::<Self>(&content) {
            Ok(file) => Some(file.root),
            Err(err) => {
                warn!(%err, %path, "Ignoring undecodable archive root file");
                None
            }
        }
    }

    pub fn save(dir: &Utf8Path, root: Cid) -> EyreResult<()> {
        let path = dir.join(ROOT_FILE);
        let content = serde_json::to_string(&Self { root })?;

        std::fs::write(&path, content)
            .wrap_err_with(|| format!("failed to persist archive root to {path:?}"))?;

        Ok(())
    }
}
