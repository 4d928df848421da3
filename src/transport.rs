//! HTTP transport for the forge REST API.
//!
//! Handles bearer authentication, `Link`-header pagination and mapping of
//! error responses into typed `ForgeError`s. Retrying is layered on top by
//! [`crate::retry`], so one call here is exactly one HTTP request.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, ForgeError};
use crate::types::Page;

/// Items requested per page; the forge maximum.
pub const PER_PAGE: u32 = 100;

/// Fallback wait when a rate limit carries no reset information.
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// HTTP transport layer with bearer authentication.
pub struct HttpTransport {
    base_url: String,
    authorization: HeaderValue,
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for API requests (e.g., "<https://api.github.com>")
    /// * `token` - Bearer credential
    /// * `timeout` - Request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be created.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, Error> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|_| Error::Configuration("token contains invalid characters".to_string()))?;
        authorization.set_sensitive(true);

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization,
            client,
        })
    }

    /// Fetch one page of a list endpoint.
    ///
    /// # Arguments
    ///
    /// * `path` - API path (e.g., "/repos/octo/wall/pulls")
    /// * `params` - Extra query parameters
    /// * `page` - 1-based page number
    /// * `repository` - `owner/name`, used to label not-found errors
    ///
    /// # Errors
    ///
    /// Returns a `ForgeError` on API errors and `Error::Http` when the body
    /// cannot be decoded.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        page: u32,
        repository: &str,
    ) -> Result<Page<T>, Error> {
        let url = format!("{}{}", self.base_url, path);
        let page_param = page.to_string();
        let per_page = PER_PAGE.to_string();

        debug!(%url, page, "fetching page");
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header(API_VERSION_HEADER, API_VERSION)
            .query(params)
            .query(&[("per_page", per_page.as_str()), ("page", page_param.as_str())])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, repository).await);
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_page);

        let items: Vec<T> = response.json().await.map_err(body_error)?;
        Ok(Page::new(page, items, next))
    }

    /// Fetch a binary resource such as an avatar image.
    ///
    /// The credential is not sent; avatar hosts are public.
    ///
    /// # Returns
    ///
    /// The content type (defaulting to `image/png`) and the body bytes.
    ///
    /// # Errors
    ///
    /// Returns a `ForgeError` for non-success responses.
    pub async fn get_bytes(&self, url: &str) -> Result<(String, Vec<u8>), Error> {
        let response = self.client.get(url).send().await.map_err(request_error)?;

        if !response.status().is_success() {
            return Err(parse_error_response(response, url).await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| "image/png".to_string(), String::from);
        let bytes = response.bytes().await.map_err(body_error)?;

        Ok((content_type, bytes.to_vec()))
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn request_error(e: reqwest::Error) -> Error {
    Error::Forge(ForgeError::Transient {
        message: e.to_string(),
    })
}

fn body_error(e: reqwest::Error) -> Error {
    if e.is_decode() {
        Error::Http(format!("Failed to parse response: {e}"))
    } else {
        request_error(e)
    }
}

/// Extract the page number of the `rel="next"` target of a `Link` header.
#[must_use]
pub fn parse_next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == "rel=\"next\"");
        if !is_next {
            return None;
        }

        let url = Url::parse(target.trim_start_matches('<').trim_end_matches('>')).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

/// Parse an error response into a typed error.
async fn parse_error_response(response: Response, repository: &str) -> Error {
    let status = response.status();
    let headers = response.headers().clone();

    let data: Value = response.json().await.unwrap_or_else(|_| serde_json::json!({}));
    let message = data
        .get("message")
        .and_then(|v| v.as_str())
        .map_or_else(|| format!("HTTP {}", status.as_u16()), String::from);

    Error::Forge(classify_error(
        status,
        &headers,
        message,
        repository,
        Utc::now().timestamp(),
    ))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Map a non-success status and its headers to a `ForgeError`.
///
/// `now` is the current unix time, used to turn `x-ratelimit-reset` into a
/// relative wait.
#[must_use]
pub fn classify_error(
    status: StatusCode,
    headers: &HeaderMap,
    message: String,
    repository: &str,
    now: i64,
) -> ForgeError {
    let retry_after = header(headers, "retry-after").and_then(|s| s.trim().parse::<u64>().ok());
    let quota_exhausted = header(headers, "x-ratelimit-remaining").map(str::trim) == Some("0");
    let reset_wait = header(headers, "x-ratelimit-reset")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|reset| u64::try_from(reset - now).unwrap_or(0));

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (quota_exhausted || retry_after.is_some()));

    match status {
        _ if rate_limited => ForgeError::RateLimited {
            message,
            retry_after: retry_after
                .or(reset_wait)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ForgeError::Authentication {
            status: status.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND => ForgeError::RepositoryNotFound {
            repository: repository.to_string(),
            message,
        },
        StatusCode::CONFLICT => ForgeError::EmptyRepository {
            repository: repository.to_string(),
            message,
        },
        s if s.is_server_error() => ForgeError::Server {
            status: s.as_u16(),
            message,
        },
        s => ForgeError::Unexpected {
            status: s.as_u16(),
            message,
        },
    }
}
