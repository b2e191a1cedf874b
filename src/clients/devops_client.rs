use crate::clients::ticket_provider::TicketProvider;
use crate::config::ResolvedAccountConfig;
use crate::errors::DevOpsError;
use crate::types::devops::{IssueResponse, Ticket};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_RETRY_COUNT: u32 = 3;
const DEFAULT_TIMEOUT_MILLIS: u64 = 10_000;
const DEFAULT_BACKOFF_MILLIS: u64 = 500;

/// Jira-compatible REST client (`GET /rest/api/2/issue/{key}`).
#[derive(Debug)]
pub struct DevOpsClient {
    base_url: String,
    token: String,
    client: Client,
    retry_count: u32,
    timeout: Duration,
    backoff: Duration,
}

/// Outcome of a single HTTP attempt.
enum Attempt {
    Found(IssueResponse),
    Missing,
    Retry(DevOpsError),
    Fail(DevOpsError),
}

impl DevOpsClient {
    pub fn new(base_url: String, token: String) -> Self {
        DevOpsClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
            retry_count: DEFAULT_RETRY_COUNT,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MILLIS),
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MILLIS),
        }
    }

    pub fn from_account(account: &ResolvedAccountConfig) -> Self {
        Self::new(account.base_url.clone(), account.token.clone())
            .with_retry_count(account.retry_count)
            .with_timeout(Duration::from_millis(account.timeout))
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn issue_url(&self, key: &str) -> String {
        format!("{}/rest/api/2/issue/{}", self.base_url, key)
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response_result = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response_result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Retry(DevOpsError::TimeoutError),
            Err(e) => return Attempt::Retry(DevOpsError::NetworkError(e)),
        };

        let status = response.status();
        if status.is_success() {
            // A malformed body may be transient (proxy error pages), so retry it.
            return match response.json::<IssueResponse>().await {
                Ok(issue) => Attempt::Found(issue),
                Err(e) => Attempt::Retry(DevOpsError::ParseError(e)),
            };
        }

        match status {
            StatusCode::NOT_FOUND => Attempt::Missing,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Attempt::Fail(DevOpsError::AuthenticationError)
            }
            StatusCode::TOO_MANY_REQUESTS => Attempt::Retry(DevOpsError::RateLimitExceeded),
            s if s.is_server_error() => Attempt::Retry(DevOpsError::ServerError {
                status_code: s.as_u16(),
            }),
            s if s.is_client_error() => Attempt::Fail(DevOpsError::ServerError {
                status_code: s.as_u16(),
            }),
            s => Attempt::Fail(DevOpsError::UnexpectedResponseStructure(format!(
                "Unhandled HTTP status: {}",
                s
            ))),
        }
    }

    async fn make_request_with_retry(&self, url: &str) -> Result<Option<IssueResponse>, DevOpsError> {
        let mut last_error: Option<DevOpsError> = None;
        let mut wait_time = self.backoff;

        for attempt in 0..self.retry_count {
            if attempt > 0 {
                sleep(wait_time).await;
                wait_time *= 2; // Exponential backoff
            }

            match self.attempt(url).await {
                Attempt::Found(issue) => return Ok(Some(issue)),
                Attempt::Missing => return Ok(None),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) => {
                    tracing::debug!("Tracker request attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            DevOpsError::UnexpectedResponseStructure(
                "Request failed after multiple retries without a specific error.".to_string(),
            )
        }))
    }

    /// `Ok(None)` when the tracker does not know the key.
    pub async fn fetch_ticket(&self, key: &str) -> Result<Option<Ticket>, DevOpsError> {
        let url = self.issue_url(key);
        let issue = self.make_request_with_retry(&url).await?;
        Ok(issue.map(Ticket::from))
    }
}

#[async_trait]
impl TicketProvider for DevOpsClient {
    async fn fetch_ticket(&self, key: &str) -> Result<Option<Ticket>, DevOpsError> {
        DevOpsClient::fetch_ticket(self, key).await
    }
}
