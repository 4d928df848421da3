//! Data model types for forge responses.

pub mod commits;
pub mod page;
pub mod pulls;
pub mod repos;
pub mod users;

// Re-exports
pub use commits::Commit;
pub use page::Page;
pub use pulls::PullRequest;
pub use repos::RepoIdentity;
pub use users::ForgeUser;
