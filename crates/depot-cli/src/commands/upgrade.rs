//! Upgrade command - replace the remote server's executable with our own
//!
//! Development facility: ships the currently running `depot` binary to the
//! server, which persists it and restarts under its supervisor.

use std::path::Path;

use crate::client::Client;
use crate::config::Config;
use crate::error::Result;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!(
        "Going to upgrade server on address '{}'.\nIs everything correct? (y/n)",
        config.base_url()
    );
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
        println!("Aborted.");
        return Ok(());
    }

    let exe = std::env::current_exe()?;
    let image = tokio::fs::read(&exe).await?;
    Client::new(&config).upgrade(image).await?;
    println!("Upgrade accepted; server is restarting.");
    Ok(())
}
