//! Repository identity.

use std::fmt;

use crate::error::Error;

/// Owner and name of a forge repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoIdentity {
    owner: String,
    name: String,
}

impl RepoIdentity {
    /// Create a repository identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if either part is empty or contains a
    /// path separator.
    pub fn new(owner: &str, name: &str) -> Result<Self, Error> {
        let owner = owner.trim();
        let name = name.trim();
        for (label, value) in [("owner", owner), ("repo", name)] {
            if value.is_empty() {
                return Err(Error::Configuration(format!("repository {label} is empty")));
            }
            if value.contains('/') || value.contains('\\') {
                return Err(Error::Configuration(format!(
                    "repository {label} '{value}' must not contain a path separator"
                )));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Get the owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`, as used in API paths.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// `owner_name`, the key for persisted state and artifacts.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
