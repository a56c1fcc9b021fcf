//! Package management commands

use std::path::{Path, PathBuf};

use crate::client::Client;
use crate::config::Config;
use crate::error::{CliError, Result};

/// List all packages in a branch
pub async fn list(config_path: Option<&Path>, branch: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let listing = Client::new(&config).list_packages(branch).await?;
    println!("{listing}");
    Ok(())
}

/// Download a package into the current directory
pub async fn get(config_path: Option<&Path>, branch: &str, package: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let cwd = std::env::current_dir()?;
    let path = Client::new(&config)
        .fetch_package(branch, package, &cwd)
        .await?;
    println!("Saved '{}'.", path.display());
    Ok(())
}

/// Publish one or more package archives
pub async fn put(config_path: Option<&Path>, branch: &str, files: &[PathBuf]) -> Result<()> {
    let config = Config::load(config_path)?;
    let client = Client::new(&config);

    for path in files {
        if !path.is_file() {
            return Err(CliError::input(format!(
                "Archive not found: {}",
                path.display()
            )));
        }
        client.publish_package(branch, path).await?;
        println!("Published '{}'.", path.display());
    }
    Ok(())
}

/// Remove packages by file name or package name
pub async fn remove(config_path: Option<&Path>, branch: &str, names: &[String]) -> Result<()> {
    let config = Config::load(config_path)?;
    Client::new(&config).remove_packages(branch, names).await?;
    println!("Removed: {}.", names.join(", "));
    Ok(())
}
