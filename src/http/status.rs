//! Classification of refused release requests.

use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Header GitHub uses to report how many requests are left in the window.
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// A 4xx answer from the release host. Asking again will not help.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpStatusError {
    #[error(
        "release artifact not found at {url} (HTTP 404); check the package version and release URL template"
    )]
    NotFound { url: String },

    #[error("the release host requires authentication for {url} (HTTP 401)")]
    Unauthorized { url: String },

    #[error("access to {url} is forbidden (HTTP 403)")]
    Forbidden { url: String },

    #[error("release host rate limit exceeded for {url} (HTTP {status}); try again later")]
    RateLimited { url: String, status: u16 },

    #[error("request for {url} was rejected (HTTP {status})")]
    Rejected { url: String, status: u16 },
}

impl HttpStatusError {
    /// Classify a client error status. Anything that is not a 4xx yields `None`.
    pub fn classify(status: StatusCode, url: &str, rate_limit_exhausted: bool) -> Option<Self> {
        let url = url.to_string();
        match status {
            StatusCode::NOT_FOUND => Some(Self::NotFound { url }),
            StatusCode::UNAUTHORIZED => Some(Self::Unauthorized { url }),
            StatusCode::FORBIDDEN if rate_limit_exhausted => Some(Self::RateLimited {
                url,
                status: status.as_u16(),
            }),
            StatusCode::FORBIDDEN => Some(Self::Forbidden { url }),
            StatusCode::TOO_MANY_REQUESTS => Some(Self::RateLimited {
                url,
                status: status.as_u16(),
            }),
            s if s.is_client_error() => Some(Self::Rejected {
                url,
                status: s.as_u16(),
            }),
            _ => None,
        }
    }
}

/// Pass a successful response through. A 4xx becomes an [`HttpStatusError`];
/// any other failure status stays a `reqwest::Error` and may be retried.
pub fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limit_exhausted = response
        .headers()
        .get(RATE_LIMIT_REMAINING)
        .is_some_and(|remaining| remaining == "0");
    if let Some(e) = HttpStatusError::classify(status, response.url().as_str(), rate_limit_exhausted) {
        return Err(e.into());
    }

    Ok(response.error_for_status()?)
}
