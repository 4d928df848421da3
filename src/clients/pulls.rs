//! Pull requests resource client.

use std::sync::Arc;

use crate::error::Error;
use crate::transport::HttpTransport;
use crate::types::{Page, PullRequest, RepoIdentity};

/// Client for pull request listings.
pub struct PullsClient {
    transport: Arc<HttpTransport>,
}

impl PullsClient {
    /// Create a new pulls client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// List one page of pull requests in every state.
    ///
    /// # Arguments
    ///
    /// * `repo` - The repository
    /// * `page` - 1-based page number
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_page(&self, repo: &RepoIdentity, page: u32) -> Result<Page<PullRequest>, Error> {
        self.transport
            .get_page(
                &format!("/repos/{}/{}/pulls", repo.owner(), repo.name()),
                &[("state", "all")],
                page,
                &repo.full_name(),
            )
            .await
    }
}
