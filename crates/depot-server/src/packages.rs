//! Per-branch package store and its HTTP handlers
//!
//! A publish stages the upload outside the branch, validates it, deletes
//! any other archive claiming the same identity, moves the upload into
//! place with an atomic rename and rebuilds the index. The branch lock is
//! held across the whole sequence, so two writers on one branch cannot
//! interleave their scans and deletions.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};

use depot_core::{is_package_name, scan_packages, PKG_SUFFIX};

use crate::error::{Result, ServerError};
use crate::index::IndexBuilder;
use crate::state::{package_path, run_blocking, AppState};
use crate::NO_ENTRIES;

/// Operations on one branch's package set.
pub struct PackageStore {
    state: AppState,
    branch: String,
    dir: PathBuf,
}

impl PackageStore {
    /// Bind to `branch`, validating the name. The directory may not exist;
    /// operations report absence as `BranchNotFound`.
    pub fn new(state: &AppState, branch: &str) -> Result<Self> {
        let dir = state.branch_dir(branch)?;
        Ok(Self {
            state: state.clone(),
            branch: branch.to_string(),
            dir,
        })
    }

    fn require_dir(&self) -> Result<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(ServerError::BranchNotFound {
                name: self.branch.clone(),
            })
        }
    }

    fn rebuilder(&self) -> IndexBuilder {
        IndexBuilder::new(&self.state, &self.branch, &self.dir)
    }

    /// Sorted archive file names, one per line.
    pub async fn list(&self) -> Result<String> {
        self.require_dir()?;

        let dir = self.dir.clone();
        let files = run_blocking(move || Ok(depot_core::list_package_files(&dir)?)).await?;

        let names: Vec<String> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        if names.is_empty() {
            return Ok(NO_ENTRIES.to_string());
        }
        Ok(names.join("\n"))
    }

    /// Stream one archive's bytes back to the caller.
    pub async fn fetch(&self, file_name: &str) -> Result<Response> {
        self.require_dir()?;
        let path = package_path(&self.dir, file_name)?;

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::PackageNotFound {
                    name: file_name.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ServerError::PackageNotFound {
                name: file_name.to_string(),
            });
        }

        Response::builder()
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, metadata.len())
            .body(Body::from_stream(ReaderStream::new(file)))
            .map_err(|e| ServerError::Io(std::io::Error::other(e)))
    }

    /// Stage the uploaded archive, drop every other file claiming its
    /// identity, move the upload into place, rebuild the index.
    pub async fn publish(&self, file_name: &str, body: Body) -> Result<()> {
        if !is_package_name(file_name) {
            return Err(ServerError::invalid_name(
                file_name,
                format!("package files end in '{PKG_SUFFIX}'"),
            ));
        }
        let dst = package_path(&self.dir, file_name)?;

        let _guard = self.state.locks.lock(&self.branch).await;
        self.require_dir()?;
        info!("Got upload '{}' for branch '{}'", file_name, self.branch);

        // Staged next to the branch, never inside it: a half-written file
        // must not be visible under a package name.
        let root = self.state.root.as_ref().clone();
        let tmp = run_blocking(move || {
            Ok(tempfile::Builder::new()
                .prefix(".upload-")
                .tempfile_in(root)?)
        })
        .await?;

        let mut file = tokio::fs::File::from_std(tmp.reopen()?);
        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ServerError::UploadAborted {
                message: e.to_string(),
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let tmp_path = tmp.path().to_path_buf();
        let identity = run_blocking(move || Ok(depot_core::extract_identity(&tmp_path)?)).await?;

        let dir = self.dir.clone();
        let packages = run_blocking(move || Ok(scan_packages(&dir)?)).await?;
        if let Some(paths) = packages.get(&identity) {
            for path in paths {
                warn!("Removing old package '{}'", path.display());
                tokio::fs::remove_file(path).await?;
            }
        }

        tmp.persist(&dst).map_err(|e| ServerError::Io(e.error))?;
        info!("Stored new package '{}'", dst.display());

        self.rebuilder().rebuild().await
    }

    /// Remove each of `names`; a name is a literal archive file name or a
    /// package identity. Per-name misses are logged and accumulated, never
    /// fatal to the batch. Exactly one rebuild at the end.
    pub async fn remove(&self, names: &[String]) -> Result<()> {
        let _guard = self.state.locks.lock(&self.branch).await;
        self.require_dir()?;

        let mut missing = Vec::new();
        for name in names {
            if is_package_name(name) {
                info!("Looking for file with name '{name}'");
                let path = match package_path(&self.dir, name) {
                    Ok(path) => path,
                    Err(e) => {
                        error!("Skipping '{name}': {e}");
                        missing.push(name.clone());
                        continue;
                    }
                };
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => warn!("Removed package '{}'", path.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        error!("No such file '{name}'");
                        missing.push(name.clone());
                    }
                    Err(e) => return Err(e.into()),
                }
                continue;
            }

            info!("Looking for package with name '{name}'");
            // scanned fresh per entry so earlier deletions in this batch
            // are already reflected
            let dir = self.dir.clone();
            let packages = run_blocking(move || Ok(scan_packages(&dir)?)).await?;
            match packages.get(name.as_str()) {
                Some(paths) => {
                    for path in paths {
                        tokio::fs::remove_file(path).await?;
                        warn!("Removed package '{}'", path.display());
                    }
                }
                None => {
                    error!("No package with name '{name}'");
                    missing.push(name.clone());
                }
            }
        }

        if !missing.is_empty() {
            warn!(
                "{} of {} name(s) not found in branch '{}'",
                missing.len(),
                names.len(),
                self.branch
            );
        }

        self.rebuilder().rebuild().await
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListOrFetchQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub names: String,
}

pub async fn get_packages(
    State(state): State<AppState>,
    UrlPath(branch): UrlPath<String>,
    Query(query): Query<ListOrFetchQuery>,
) -> Result<Response> {
    let store = PackageStore::new(&state, &branch)?;
    match query.name {
        Some(name) => store.fetch(&name).await,
        None => Ok(store.list().await?.into_response()),
    }
}

pub async fn post_package(
    State(state): State<AppState>,
    UrlPath(branch): UrlPath<String>,
    Query(query): Query<PublishQuery>,
    body: Body,
) -> Result<StatusCode> {
    PackageStore::new(&state, &branch)?
        .publish(&query.name, body)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn delete_packages(
    State(state): State<AppState>,
    UrlPath(branch): UrlPath<String>,
    Query(query): Query<RemoveQuery>,
) -> Result<StatusCode> {
    let names: Vec<String> = query
        .names
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    PackageStore::new(&state, &branch)?.remove(&names).await?;
    Ok(StatusCode::OK)
}
