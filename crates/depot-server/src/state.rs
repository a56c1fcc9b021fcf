//! Shared service state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, ServerError};
use crate::locks::BranchLocks;
use crate::upgrade::UpgradeCoordinator;

/// State shared by every request handler.
///
/// Cheap to clone; everything mutable lives behind its own synchronization.
#[derive(Clone)]
pub struct AppState {
    /// Repository root; one subdirectory per branch.
    pub root: Arc<PathBuf>,
    /// External indexer command, `repo-add` unless overridden.
    pub indexer: Arc<str>,
    /// Per-branch mutation locks.
    pub locks: BranchLocks,
    /// Self-upgrade coordinator.
    pub upgrade: Arc<UpgradeCoordinator>,
}

impl AppState {
    /// Build state over `root`, upgrading the given executable path.
    pub fn new(root: impl Into<PathBuf>, upgrade: UpgradeCoordinator) -> Self {
        Self {
            root: Arc::new(root.into()),
            indexer: Arc::from(crate::index::DEFAULT_INDEXER),
            locks: BranchLocks::new(),
            upgrade: Arc::new(upgrade),
        }
    }

    /// Build state over `root`, upgrading the currently running executable.
    pub fn for_current_exe(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        Ok(Self::new(root, UpgradeCoordinator::for_current_exe()?))
    }

    /// Override the indexer command (the tests point this at stubs).
    pub fn with_indexer(mut self, command: impl AsRef<str>) -> Self {
        self.indexer = Arc::from(command.as_ref());
        self
    }

    /// Directory backing `branch`, after validating the name.
    ///
    /// Existence is not checked; callers decide whether absence is an error.
    pub fn branch_dir(&self, branch: &str) -> Result<PathBuf> {
        validate_component(branch)?;
        Ok(self.root.join(branch))
    }
}

/// Reject names that are not a single, normal path component.
///
/// Every branch and file name arriving over the network ends up joined onto
/// a filesystem path; anything with separators or dot-dots must never get
/// that far.
pub fn validate_component(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ServerError::invalid_name(name, "empty"));
    }
    if name == "." || name == ".." {
        return Err(ServerError::invalid_name(name, "reserved"));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c == '\0')
    {
        return Err(ServerError::invalid_name(name, "contains a path separator"));
    }
    Ok(())
}

/// Run blocking filesystem work off the async scheduler.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Io(std::io::Error::other(e)))?
}

/// Convenience for constructing the path of a package file inside a branch.
pub(crate) fn package_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    validate_component(file_name)?;
    Ok(dir.join(file_name))
}
