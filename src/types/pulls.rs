//! Pull request data as returned by the list endpoint.

use serde::{Deserialize, Serialize};

use super::users::ForgeUser;

/// Pull request summary.
///
/// Only the fields the roster needs are decoded; everything else in the
/// forge payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// Repository-scoped pull request number
    pub number: u64,
    /// Web URL of the pull request
    #[serde(default)]
    pub html_url: Option<String>,
    /// "open" or "closed"
    #[serde(default)]
    pub state: Option<String>,
    /// Author account, null once the account has been deleted
    #[serde(default)]
    pub user: Option<ForgeUser>,
}

impl PullRequest {
    /// Identifier used for attribution.
    #[must_use]
    pub fn item_id(&self) -> String {
        self.number.to_string()
    }
}
