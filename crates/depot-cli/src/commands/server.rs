//! Server command - run the repository service

use std::path::Path;

use tracing::info;
use tracing_subscriber::EnvFilter;

use depot_server::{serve, AppState};

use crate::config::Config;
use crate::error::{CliError, Result};

pub async fn run(config_path: Option<&Path>, root: &Path, debug: bool, notify: bool) -> Result<()> {
    let default_filter = if debug {
        "depot=debug,depot_server=debug,depot_core=debug,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = Config::load(config_path)?;

    if !root.is_dir() {
        return Err(CliError::input(format!(
            "Repositories root '{}' is not a directory",
            root.display()
        )));
    }

    let state = AppState::for_current_exe(root)?;
    serve(state, config.listen_addr(), notify)
        .await
        .map_err(|e| CliError::Io {
            message: e.to_string(),
        })?;

    info!("Shutdown.");
    Ok(())
}
