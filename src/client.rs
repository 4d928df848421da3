//! Forge REST client.
//!
//! Aggregates the resource clients over one shared transport and exposes
//! them to the pipeline as a [`ForgeSource`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::{AvatarsClient, CommitsClient, PullsClient};
use crate::config::Config;
use crate::error::Error;
use crate::forge::{Avatar, ForgeSource};
use crate::transport::HttpTransport;
use crate::types::{Commit, Page, PullRequest, RepoIdentity};

/// Default base URL for the forge API.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main client for the forge API.
///
/// # Example
///
/// ```rust,ignore
/// use contrib_wall::{ForgeClient, ForgeSource, RepoIdentity};
///
/// let client = ForgeClient::new("ghp_token", None, None)?;
/// let repo = RepoIdentity::new("octo", "wall")?;
/// let first = client.pull_requests_page(&repo, 1).await?;
/// ```
pub struct ForgeClient {
    transport: Arc<HttpTransport>,
    pulls: PullsClient,
    commits: CommitsClient,
    avatars: AvatarsClient,
}

impl ForgeClient {
    /// Create a new forge client.
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer credential
    /// * `base_url` - Base URL for API requests (default: <https://api.github.com>)
    /// * `timeout` - Request timeout (default: 30 seconds)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be created.
    pub fn new(token: &str, base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self, Error> {
        let base_url = base_url.unwrap_or(DEFAULT_BASE_URL);
        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let transport = Arc::new(HttpTransport::new(base_url, token, timeout)?);

        Ok(Self {
            pulls: PullsClient::new(Arc::clone(&transport)),
            commits: CommitsClient::new(Arc::clone(&transport)),
            avatars: AvatarsClient::new(Arc::clone(&transport)),
            transport,
        })
    }

    /// Create a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            &config.token,
            Some(&config.base_url),
            Some(config.retry.attempt_timeout),
        )
    }

    /// Get the underlying HTTP transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<HttpTransport> {
        &self.transport
    }
}

#[async_trait]
impl ForgeSource for ForgeClient {
    async fn pull_requests_page(
        &self,
        repo: &RepoIdentity,
        page: u32,
    ) -> Result<Page<PullRequest>, Error> {
        self.pulls.list_page(repo, page).await
    }

    async fn commits_page(&self, repo: &RepoIdentity, page: u32) -> Result<Page<Commit>, Error> {
        self.commits.list_page(repo, page).await
    }

    async fn avatar(&self, url: &str, size: u32) -> Result<Avatar, Error> {
        self.avatars.fetch(url, size).await
    }
}
