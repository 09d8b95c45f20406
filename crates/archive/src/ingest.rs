use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use station_primitives::Cid;
use tokio::fs;
use tracing::{debug, warn};

use crate::{TreeError, TreeManager};

/// Outcome of a staging-area ingestion: the final root plus, per file, the
/// root that insertion produced — an audit trail of intermediate roots.
#[derive(Clone, Debug, Serialize)]
pub struct IngestReport {
    pub root: Cid,
    pub files: Vec<IngestedFile>,
}

#[derive(Clone, Debug, Serialize)]
pub struct IngestedFile {
    pub path: String,
    pub root: Cid,
}

impl TreeManager {
    /// Inserts every file under `area` into the tree, strictly sequentially:
    /// each insertion observes the root produced by the previous one.
    pub async fn ingest_from_staging(&self, area: &Utf8Path) -> Result<IngestReport, TreeError> {
        let staged = collect_files(area).await?;

        let mut files = Vec::with_capacity(staged.len());

        for (path, rel) in staged {
            let content = fs::read(&path).await?;
            let root = self.insert(&rel, &content).await?;

            debug!(%root, path = %rel, "Ingested staged file");

            files.push(IngestedFile { path: rel, root });
        }

        let root = match files.last() {
            Some(file) => file.root,
            None => self.get_or_create_root().await?,
        };

        Ok(IngestReport { root, files })
    }
}

/// All regular files under `area`, as (absolute, tree-relative) pairs in
/// deterministic (sorted) order.
async fn collect_files(area: &Utf8Path) -> Result<Vec<(Utf8PathBuf, String)>, TreeError> {
    let mut stack = vec![area.to_owned()];
    let mut files = Vec::new();

    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = match Utf8PathBuf::from_path_buf(entry.path()) {
                Ok(path) => path,
                Err(path) => {
                    warn!(?path, "Skipping non-utf8 path in staging area");
                    continue;
                }
            };

            let file_type = entry.file_type().await?;

            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() {
                let Ok(rel) = path.strip_prefix(area) else {
                    continue;
                };

                files.push((path.clone(), rel.as_str().to_owned()));
            }
        }
    }

    files.sort();

    Ok(files)
}
