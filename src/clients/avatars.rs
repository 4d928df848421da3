//! Avatar image client.

use std::sync::Arc;

use crate::error::Error;
use crate::forge::{sized_avatar_url, Avatar};
use crate::transport::HttpTransport;

/// Client for avatar downloads.
pub struct AvatarsClient {
    transport: Arc<HttpTransport>,
}

impl AvatarsClient {
    /// Create a new avatars client.
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// Download an avatar at roughly `size` pixels square.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be fetched.
    pub async fn fetch(&self, url: &str, size: u32) -> Result<Avatar, Error> {
        let (content_type, bytes) = self.transport.get_bytes(&sized_avatar_url(url, size)).await?;
        Ok(Avatar {
            content_type,
            bytes,
        })
    }
}
