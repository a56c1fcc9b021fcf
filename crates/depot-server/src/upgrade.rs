//! Self-upgrade of the running service
//!
//! The upgrade protocol replaces the service's executable on disk, answers
//! the caller over a connection marked for closure, and exits shortly after
//! with a distinguished status code. A supervisor configured to restart on
//! that code (`RestartForceExitStatus=42` under systemd) brings up the new
//! image; the running process never re-execs itself.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::watch;
use tracing::warn;

use crate::error::{Result, ServerError};
use crate::state::{run_blocking, AppState};

/// Exit status signaling "restart me" to the supervisor.
pub const RESTART_EXIT_CODE: i32 = 42;

/// Grace period between answering the caller and pulling the plug.
const EXIT_DELAY: Duration = Duration::from_secs(2);

/// Drives the replace-executable-and-restart protocol.
pub struct UpgradeCoordinator {
    exe_path: PathBuf,
    drain: watch::Sender<bool>,
}

impl UpgradeCoordinator {
    pub fn new(exe_path: impl Into<PathBuf>) -> Self {
        let (drain, _) = watch::channel(false);
        Self {
            exe_path: exe_path.into(),
            drain,
        }
    }

    /// Coordinator targeting the currently running executable.
    pub fn for_current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    /// Watch for the drain signal; flips to `true` once a new image has
    /// been persisted and the accept loop should stop taking connections.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.drain.subscribe()
    }

    /// Replace the executable with `image` and sync it to stable storage.
    ///
    /// The image is staged next to the executable and renamed over it: a
    /// running binary cannot be truncated in place (ETXTBSY), and the
    /// rename keeps the swap atomic. An empty image is rejected without
    /// touching anything.
    pub async fn persist(&self, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(ServerError::EmptyUpgradePayload);
        }

        let exe_path = self.exe_path.clone();
        let image = image.to_vec();
        run_blocking(move || {
            let parent = exe_path.parent().ok_or_else(|| {
                ServerError::Io(std::io::Error::other("executable path has no parent"))
            })?;
            let mut tmp = tempfile::Builder::new()
                .prefix(".upgrade-")
                .tempfile_in(parent)?;

            use std::io::Write;
            tmp.write_all(&image)?;
            tmp.as_file().sync_all()?;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o755))?;

            tmp.persist(&exe_path)
                .map_err(|e| ServerError::Io(e.error))?;
            warn!(
                "Wrote {} byte image over '{}'",
                image.len(),
                exe_path.display()
            );
            Ok(())
        })
        .await
    }

    /// Stop accepting new connections.
    pub fn begin_drain(&self) {
        let _ = self.drain.send(true);
    }

    /// Exit with the restart code once the response has had time to reach
    /// the caller over the closing connection.
    pub fn schedule_exit(&self) {
        tokio::spawn(async {
            tokio::time::sleep(EXIT_DELAY).await;
            warn!("Going to forced restart, exiting with status {RESTART_EXIT_CODE}");
            std::process::exit(RESTART_EXIT_CODE);
        });
    }
}

/// `POST /upgrade`: persist the new image, drain, answer over a closing
/// connection, exit shortly after.
pub async fn post_upgrade(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    warn!("Going to upgrade myself ({} byte image)", body.len());
    state.upgrade.persist(&body).await?;
    state.upgrade.begin_drain();
    state.upgrade.schedule_exit();

    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    Ok(response)
}
