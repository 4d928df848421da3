//! Account data embedded in forge responses.

use serde::{Deserialize, Serialize};

/// A forge account as it appears on pull requests and commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeUser {
    /// Unique login name
    pub login: String,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Profile page URL
    #[serde(default)]
    pub html_url: Option<String>,
}

impl ForgeUser {
    /// Build a user with only a login, as the test fixtures need.
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            avatar_url: None,
            html_url: None,
        }
    }

    /// Attach an avatar URL.
    #[must_use]
    pub fn with_avatar(mut self, avatar_url: &str) -> Self {
        self.avatar_url = Some(avatar_url.to_string());
        self
    }
}
