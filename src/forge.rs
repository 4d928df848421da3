//! The forge data source seam.
//!
//! Collectors only see this trait, so the pipeline can run against the
//! real REST client or the scripted mock in [`crate::testing`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::Error;
use crate::types::{Commit, Page, PullRequest, RepoIdentity};

/// Paginated access to the data the roster is built from.
///
/// Each call is a single attempt; retries and timeouts are applied by the
/// caller.
#[async_trait]
pub trait ForgeSource: Send + Sync {
    /// Fetch one page of pull requests (all states) for a repository.
    async fn pull_requests_page(
        &self,
        repo: &RepoIdentity,
        page: u32,
    ) -> Result<Page<PullRequest>, Error>;

    /// Fetch one page of commits for a repository.
    async fn commits_page(&self, repo: &RepoIdentity, page: u32) -> Result<Page<Commit>, Error>;

    /// Fetch an avatar image.
    async fn avatar(&self, url: &str, size: u32) -> Result<Avatar, Error>;
}

/// A downloaded avatar image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    /// MIME type reported by the avatar host
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

impl Avatar {
    /// Encode as a `data:` URI for inlining into markup.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Append the forge's avatar size hint to an avatar URL.
#[must_use]
pub fn sized_avatar_url(url: &str, size: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}s={size}")
}
