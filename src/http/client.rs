//! HTTP client for streaming release artifacts to disk.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use std::io::Write;
use std::time::Duration;

use super::status::check_status;

/// How often a failed download is attempted again.
///
/// The default makes a single attempt. Only network and server failures are
/// repeated; refused requests (`HttpStatusError`) and local write errors
/// are returned at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    pub fn new(retries: usize) -> Self {
        Self {
            retries,
            delay: Self::DEFAULT_DELAY,
        }
    }

    fn attempts(&self) -> usize {
        self.retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl HttpClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    /// Builds a client that identifies itself with `user_agent`.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client))
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Streams `url` into the writer returned by `open_writer`.
    ///
    /// The writer is opened only after the server answered with a success
    /// status, once per attempt.
    #[tracing::instrument(skip(self, open_writer))]
    pub async fn download<W, F>(&self, url: &str, open_writer: F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        let attempts = self.policy.attempts();
        let mut attempt = 1;
        loop {
            let err = match self.download_once(url, &open_writer).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => e,
            };
            if attempt >= attempts || !is_transient(&err) {
                return Err(err);
            }
            warn!(
                "Download attempt {}/{} failed ({:#}), retrying in {:?}...",
                attempt, attempts, err, self.policy.delay
            );
            tokio::time::sleep(self.policy.delay).await;
            attempt += 1;
        }
    }

    async fn download_once<W, F>(&self, url: &str, open_writer: &F) -> Result<u64>
    where
        W: Write,
        F: Fn() -> Result<W>,
    {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to connect to the release host")?;
        let mut response = check_status(response)?;

        let mut writer = open_writer()?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .context("Connection dropped while downloading")?
        {
            writer
                .write_all(&chunk)
                .context("Failed to write downloaded data")?;
            written += chunk.len() as u64;
        }
        writer.flush().context("Failed to flush downloaded data")?;

        debug!("Downloaded {:.2} MB", written as f64 / (1024.0 * 1024.0));
        Ok(written)
    }
}

/// A failure is worth another attempt only if it came from the transport or
/// a server error status. 4xx answers are `HttpStatusError`, never `reqwest::Error`.
fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<reqwest::Error>())
}
