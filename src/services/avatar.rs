//! Avatar downloads and the startup connectivity probe.
//!
//! Both are best-effort: every failure is logged and turned into `None` /
//! `false`, never an error for the caller.

use crate::models::BridgeSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;

/// Downloads avatar images into `{avatar_dir}/{account_id}.jpg`.
#[derive(Debug, Clone)]
pub struct AvatarFetcher {
    client: reqwest::Client,
    avatar_dir: Utf8PathBuf,
}

impl AvatarFetcher {
    /// Fetcher with the timeout and cache directory from `settings`.
    pub fn new(settings: &BridgeSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.avatar_timeout())
            .build()
            .context("Failed to build HTTP client for avatars")?;

        Ok(Self::with_client(client, settings.avatar_dir.clone()))
    }

    pub fn with_client(client: reqwest::Client, avatar_dir: Utf8PathBuf) -> Self {
        Self { client, avatar_dir }
    }

    pub fn avatar_dir(&self) -> &Utf8Path {
        &self.avatar_dir
    }

    /// Deterministic local path for an account's avatar.
    pub fn avatar_path(&self, account_id: &str) -> Utf8PathBuf {
        self.avatar_dir.join(format!("{}.jpg", account_id))
    }

    /// Download `url` for `account_id`; `None` on no URL or any failure.
    pub async fn fetch(&self, url: Option<&str>, account_id: &str) -> Option<Utf8PathBuf> {
        let url = url?;

        match self.download(url, account_id).await {
            Ok(path) => {
                tracing::debug!("Saved avatar for {} to {}", account_id, path);
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Error downloading avatar for {}: {:#}", account_id, e);
                None
            }
        }
    }

    async fn download(&self, url: &str, account_id: &str) -> Result<Utf8PathBuf> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Avatar host rejected {}", url))?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read avatar body")?;

        tokio::fs::create_dir_all(&self.avatar_dir)
            .await
            .with_context(|| format!("Failed to create avatar directory: {}", self.avatar_dir))?;

        let path = self.avatar_path(account_id);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write avatar: {}", path))?;

        Ok(path)
    }
}

/// GET `url` with `timeout`; true when any HTTP response comes back.
pub async fn check_connectivity(url: &str, timeout: Duration) -> bool {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("Failed to build HTTP client for connectivity check: {}", e);
            return false;
        }
    };

    match client.get(url).send().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("No internet connection ({}): {}", url, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_path() {
        let fetcher =
            AvatarFetcher::with_client(reqwest::Client::new(), Utf8PathBuf::from("avatars"));
        assert_eq!(fetcher.avatar_path("42"), Utf8PathBuf::from("avatars/42.jpg"));
    }

    #[tokio::test]
    async fn test_fetch_without_url() {
        let fetcher =
            AvatarFetcher::with_client(reqwest::Client::new(), Utf8PathBuf::from("avatars"));
        assert_eq!(fetcher.fetch(None, "42").await, None);
    }

    #[tokio::test]
    async fn test_connectivity_unreachable() {
        // port 1 on loopback refuses connections
        assert!(!check_connectivity("http://127.0.0.1:1/", Duration::from_secs(1)).await);
    }
}
