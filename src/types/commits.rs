//! Commit data as returned by the list endpoint.

use serde::{Deserialize, Serialize};

use super::users::ForgeUser;

/// Commit summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit SHA
    pub sha: String,
    /// Web URL of the commit
    #[serde(default)]
    pub html_url: Option<String>,
    /// Forge account linked to the commit author email; null when the
    /// email matches no account or the account was deleted
    #[serde(default)]
    pub author: Option<ForgeUser>,
}

impl Commit {
    /// Login of the linked author account, if one can be resolved.
    #[must_use]
    pub fn author_login(&self) -> Option<&str> {
        self.author
            .as_ref()
            .map(|a| a.login.as_str())
            .filter(|login| !login.is_empty())
    }
}
