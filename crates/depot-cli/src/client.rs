//! HTTP client for the remote repository operations

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::config::Config;
use crate::error::{CliError, Result};

/// Thin wrapper over reqwest bound to one configured server.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Propagate a non-success status as the server's own message.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(CliError::Server {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }

    pub async fn list_branches(&self) -> Result<String> {
        let response = self.http.get(self.url("/branches")).send().await?;
        Ok(Self::check(response).await?.text().await?)
    }

    pub async fn create_branch(&self, name: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/branches"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn list_packages(&self, branch: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url(&format!("/packages/{branch}")))
            .send()
            .await?;
        Ok(Self::check(response).await?.text().await?)
    }

    /// Download `name` into `dest_dir`, streaming to disk.
    pub async fn fetch_package(&self, branch: &str, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let response = self
            .http
            .get(self.url(&format!("/packages/{branch}")))
            .query(&[("name", name)])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let path = dest_dir.join(name);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(path)
    }

    /// Publish one archive, streaming it from disk.
    pub async fn publish_package(&self, branch: &str, path: &Path) -> Result<()> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CliError::input(format!("Not a file name: {}", path.display())))?
            .to_string();

        let file = tokio::fs::File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .http
            .post(self.url(&format!("/packages/{branch}")))
            .query(&[("name", name.as_str())])
            .body(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn remove_packages(&self, branch: &str, names: &[String]) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/packages/{branch}")))
            .query(&[("names", names.join(","))])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Send a new executable image; the server answers and then restarts.
    pub async fn upgrade(&self, image: Vec<u8>) -> Result<()> {
        let response = self.http.post(self.url("/upgrade")).body(image).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
