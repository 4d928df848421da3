//! Commits resource client.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, ForgeError};
use crate::transport::HttpTransport;
use crate::types::{Commit, Page, RepoIdentity};

/// Client for commit listings.
pub struct CommitsClient {
    transport: Arc<HttpTransport>,
}

impl CommitsClient {
    /// Create a new commits client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// List one page of commits on the default branch.
    ///
    /// A repository without any commits yields a single empty last page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_page(&self, repo: &RepoIdentity, page: u32) -> Result<Page<Commit>, Error> {
        let result = self
            .transport
            .get_page(
                &format!("/repos/{}/{}/commits", repo.owner(), repo.name()),
                &[],
                page,
                &repo.full_name(),
            )
            .await;
        empty_repository_as_last_page(result, page)
    }
}

fn empty_repository_as_last_page(
    result: Result<Page<Commit>, Error>,
    page: u32,
) -> Result<Page<Commit>, Error> {
    match result {
        Err(Error::Forge(ForgeError::EmptyRepository { repository, .. })) => {
            debug!(repository = %repository, page, "repository has no commits");
            Ok(Page::new(page, Vec::new(), None))
        }
        other => other,
    }
}
