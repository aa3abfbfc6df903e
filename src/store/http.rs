use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{JoinError, Result};
use crate::store::{RemoteStore, Revision};

/// Bounded exponential backoff for transient store failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based), doubling each time
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Firebase Realtime Database REST client
pub struct HttpStore {
    client: Client,
    base_url: String,
    auth: Option<String>,
    retry: RetryPolicy,
}

impl HttpStore {
    const ETAG_REQUEST_HEADER: &'static str = "X-Firebase-ETag";

    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: None,
            retry,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let store = Self::new(&config.base_url, config.timeout(), config.retry_policy())?;
        Ok(match &config.auth {
            Some(token) => store.with_auth(token.clone()),
            None => store,
        })
    }

    /// Appends `auth=<token>` to every request
    pub fn with_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(token.into());
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.auth {
            Some(token) => builder.query(&[("auth", token)]),
            None => builder,
        }
    }

    /// Sends a request and reads its body, retrying transient failures per
    /// the retry policy. A failure while reading the body counts the same as
    /// one while sending.
    ///
    /// 412 is handed back to the caller so conditional writes can see it.
    async fn execute<F>(&self, path: &str, build: F) -> Result<Reply>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match exchange(build(), path).await {
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Remote store request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

/// A fully read response
struct Reply {
    status: StatusCode,
    etag: Option<String>,
    body: String,
}

async fn exchange(request: RequestBuilder, path: &str) -> Result<Reply> {
    let response = request.send().await.map_err(|err| map_transport(err, path))?;
    let response = check_status(response, path)?;

    let status = response.status();
    let etag = response
        .headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.map_err(|err| map_transport(err, path))?;
    Ok(Reply { status, etag, body })
}

fn check_status(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() || status == StatusCode::PRECONDITION_FAILED {
        Ok(response)
    } else {
        Err(JoinError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        })
    }
}

fn map_transport(err: reqwest::Error, path: &str) -> JoinError {
    if err.is_timeout() {
        JoinError::Timeout {
            path: path.to_string(),
        }
    } else {
        JoinError::Transport(err)
    }
}

fn parse_body(body: &str, path: &str) -> Result<Option<Value>> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body).map_err(|err| JoinError::malformed(path, err))?;
    Ok(if value.is_null() { None } else { Some(value) })
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        debug!(path, "GET");
        let reply = self
            .execute(path, || self.request(reqwest::Method::GET, path))
            .await?;
        parse_body(&reply.body, path)
    }

    async fn write(&self, path: &str, value: &Value) -> Result<()> {
        debug!(path, "PUT");
        self.execute(path, || self.request(reqwest::Method::PUT, path).json(value))
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(path, "DELETE");
        self.execute(path, || self.request(reqwest::Method::DELETE, path))
            .await?;
        Ok(())
    }

    async fn read_versioned(&self, path: &str) -> Result<(Option<Value>, Revision)> {
        debug!(path, "GET (versioned)");
        let reply = self
            .execute(path, || {
                self.request(reqwest::Method::GET, path)
                    .header(Self::ETAG_REQUEST_HEADER, "true")
            })
            .await?;

        let etag = reply
            .etag
            .ok_or_else(|| JoinError::malformed(path, "response carried no ETag"))?;
        let value = parse_body(&reply.body, path)?;
        Ok((value, Revision(etag)))
    }

    async fn write_if(&self, path: &str, value: &Value, revision: &Revision) -> Result<bool> {
        debug!(path, revision = revision.as_str(), "PUT (conditional)");
        let reply = self
            .execute(path, || {
                self.request(reqwest::Method::PUT, path)
                    .header(header::IF_MATCH, revision.as_str())
                    .json(value)
            })
            .await?;
        Ok(reply.status != StatusCode::PRECONDITION_FAILED)
    }
}
