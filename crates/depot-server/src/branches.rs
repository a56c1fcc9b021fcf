//! Branch store and its HTTP handlers
//!
//! Branches are directories under the repository root, created on request
//! and never deleted by this service.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::state::{run_blocking, AppState};
use crate::NO_ENTRIES;

/// One line per branch: `"name: N item(s)"`, sorted by name. Only package
/// archives count toward N.
pub async fn list_branches(state: &AppState) -> Result<String> {
    let root = state.root.as_ref().clone();

    let mut lines = run_blocking(move || {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let count = depot_core::list_package_files(&entry.path())?.len();
            lines.push(format!(
                "{}: {} item(s)",
                entry.file_name().to_string_lossy(),
                count
            ));
        }
        Ok(lines)
    })
    .await?;

    if lines.is_empty() {
        return Ok(NO_ENTRIES.to_string());
    }
    lines.sort();
    Ok(lines.join("\n"))
}

/// Create the directory backing `name`. Succeeds silently if the branch
/// already exists.
pub async fn create_branch(state: &AppState, name: &str) -> Result<()> {
    let dir = state.branch_dir(name)?;
    info!("Creating new branch directory '{}'", dir.display());

    match tokio::fs::create_dir(&dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
}

pub async fn get_branches(State(state): State<AppState>) -> Result<String> {
    list_branches(&state).await
}

pub async fn post_branches(
    State(state): State<AppState>,
    Json(request): Json<CreateBranchRequest>,
) -> Result<StatusCode> {
    create_branch(&state, &request.name).await?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{test_state, write_package};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_root() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());

        assert_eq!(list_branches(&state).await.unwrap(), NO_ENTRIES);
    }

    #[tokio::test]
    async fn test_listing_sorted_with_counts() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());

        let testing = temp.path().join("testing");
        let stable = temp.path().join("stable");
        std::fs::create_dir(&testing).unwrap();
        std::fs::create_dir(&stable).unwrap();
        write_package(&stable.join("htop-1.0-1.pkg.tar.zst"), "htop");
        write_package(&stable.join("tmux-3.4-1.pkg.tar.zst"), "tmux");
        // index artifacts and stray root files never count
        std::fs::write(stable.join("stable.db.tar.gz"), b"db").unwrap();
        std::fs::write(temp.path().join("README"), b"not a branch").unwrap();

        let listing = list_branches(&state).await.unwrap();
        assert_eq!(listing, "stable: 2 item(s)\ntesting: 0 item(s)");
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());

        create_branch(&state, "stable").await.unwrap();
        create_branch(&state, "stable").await.unwrap();
        assert!(temp.path().join("stable").is_dir());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());

        assert!(create_branch(&state, "../escape").await.is_err());
        assert!(create_branch(&state, "").await.is_err());
    }

    #[tokio::test]
    async fn test_create_over_existing_file_fails() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());
        std::fs::write(temp.path().join("stable"), b"file in the way").unwrap();

        assert!(create_branch(&state, "stable").await.is_err());
    }
}
