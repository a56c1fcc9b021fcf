//! Branch management commands

use std::path::Path;

use crate::client::Client;
use crate::config::Config;
use crate::error::Result;

/// Create a new branch on the server
pub async fn create(config_path: Option<&Path>, name: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    Client::new(&config).create_branch(name).await?;
    println!("Branch '{name}' created.");
    Ok(())
}

/// List branches with their package counts
pub async fn list(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let listing = Client::new(&config).list_branches().await?;
    println!("{listing}");
    Ok(())
}
