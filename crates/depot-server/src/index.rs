//! Index rebuild orchestration
//!
//! After any mutation the branch index is regenerated from scratch: prior
//! artifacts are deleted, then the external indexer is handed the full list
//! of archives. The index format's consistency is only guaranteed by the
//! tool's own full-rebuild mode, so no incremental mutation is attempted
//! here. Between artifact deletion and regeneration the index is absent -
//! that transient window is inherent to the protocol.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServerError};
use crate::state::{run_blocking, AppState};

/// Generated index database extension, without the leading dot.
pub const DB_EXT: &str = "db.tar.gz";

/// Indexer invoked when none is configured.
pub const DEFAULT_INDEXER: &str = "repo-add";

/// Rebuilds one branch's index artifacts.
pub struct IndexBuilder {
    branch: String,
    dir: PathBuf,
    command: String,
}

impl IndexBuilder {
    pub fn new(state: &AppState, branch: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            branch: branch.to_string(),
            dir: dir.into(),
            command: state.indexer.to_string(),
        }
    }

    /// Drop prior artifacts and regenerate the index over the current
    /// archive set. An empty branch ends up with no artifacts and no
    /// indexer run.
    pub async fn rebuild(&self) -> Result<()> {
        info!("Rebuilding index in '{}'", self.dir.display());

        let dir = self.dir.canonicalize()?;

        let prefix = format!("{}.", self.branch);
        let stale = {
            let dir = dir.clone();
            run_blocking(move || {
                let mut stale = Vec::new();
                for entry in std::fs::read_dir(&dir)? {
                    let entry = entry?;
                    if entry.file_name().to_string_lossy().starts_with(&prefix) {
                        stale.push(entry.path());
                    }
                }
                Ok(stale)
            })
            .await?
        };
        for path in stale {
            // best effort: a concurrently vanished artifact is already gone
            match tokio::fs::remove_file(&path).await {
                Ok(()) => warn!("Removed stale artifact '{}'", path.display()),
                Err(e) => debug!("Could not remove '{}': {e}", path.display()),
            }
        }

        let files = {
            let dir = dir.clone();
            run_blocking(move || Ok(depot_core::list_package_files(&dir)?)).await?
        };
        if files.is_empty() {
            warn!("No packages in '{}', skipping index build", dir.display());
            return Ok(());
        }

        let db_name = format!("{}.{}", self.branch, DB_EXT);
        debug!(
            "Executing {} {} + {} file(s) in '{}'",
            self.command,
            db_name,
            files.len(),
            dir.display()
        );

        let output = Command::new(&self.command)
            .arg(&db_name)
            .args(&files)
            .current_dir(&dir)
            .output()
            .await
            .map_err(|source| ServerError::IndexerSpawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            let status = output.status.code().unwrap_or(-1);
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(
                "Index build in '{}' failed with status {status}: stdout={stdout:?}, stderr={stderr:?}",
                dir.display()
            );
            return Err(ServerError::IndexBuildFailed {
                status,
                stdout,
                stderr,
            });
        }

        info!("Index in '{}' rebuilt successfully", dir.display());
        Ok(())
    }
}
