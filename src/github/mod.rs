#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use backoff::{Error as BackoffError, ExponentialBackoff, future::retry};
use mockall::automock;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the GitHub REST API.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The configured token could not be turned into a header.
    #[error("invalid GitHub token header")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    /// Transport-level failure (connect, timeout, body read).
    #[error("GitHub request failed: {source}")]
    RequestError {
        /// The underlying reqwest error.
        #[from]
        source: reqwest::Error,
    },
    /// Non-success response that is not part of an endpoint's contract.
    #[error("GitHub API returned HTTP {status}: {message}")]
    ApiError {
        /// HTTP status of the response.
        status: StatusCode,
        /// `message` field of the error body, when present.
        message: String,
    },
}

type Result<T> = std::result::Result<T, GithubError>;

/// A pull request as returned by the lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number.
    pub number: u64,
    /// PR title.
    pub title: String,
}

/// Outcome of a merge attempt that reached GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The PR was merged.
    Merged,
    /// GitHub declined the merge (conflict, not mergeable, already merged).
    Rejected {
        /// Upstream error message, surfaced to the user.
        message: String,
    },
}

#[automock]
#[async_trait]
pub trait GithubClient: Send + Sync {
    /// Look up a pull request by number or ref. `None` when it does not exist.
    async fn get_pull(&self, pr_ref: &str) -> Result<Option<PullRequest>>;

    /// Attempt to merge the pull request.
    async fn merge_pull(&self, pr_ref: &str) -> Result<MergeOutcome>;
}

/// REST client bound to a single repository.
#[derive(Clone)]
pub struct DefaultGithubClient {
    client: Client,
    api_url: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl DefaultGithubClient {
    /// Creates a client for `repo` (an `owner/name` slug).
    pub fn new(github_token: &str, api_url: &str, repo: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {github_token}"))?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("deploy-relay-bot"));

        let client = Client::builder().default_headers(headers).build()?;
        tracing::debug!("GitHub HTTP client built successfully");

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
        })
    }

    /// Re-usable configuration for exponential backoff.
    fn backoff_config() -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Some(Duration::from_secs(60)),
            multiplier: 2.0,
            ..Default::default()
        }
    }

    fn pull_url(&self, pr_ref: &str) -> String {
        format!("{}/repos/{}/pulls/{}", self.api_url, self.repo, pr_ref)
    }
}

/// Pulls the `message` field out of an error response body.
async fn error_message(response: reqwest::Response) -> String {
    match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(e) => {
            tracing::warn!("failed to read GitHub error body: {e}");
            String::new()
        }
    }
}

#[async_trait]
impl GithubClient for DefaultGithubClient {
    async fn get_pull(&self, pr_ref: &str) -> Result<Option<PullRequest>> {
        let url = self.pull_url(pr_ref);

        let operation = || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                tracing::warn!("network error looking up PR {pr_ref}: {e}. Retrying...");
                BackoffError::transient(GithubError::from(e))
            })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if status.is_success() {
                let pull = response
                    .json::<PullRequest>()
                    .await
                    .map_err(|e| BackoffError::permanent(GithubError::from(e)))?;
                return Ok(Some(pull));
            }

            let message = error_message(response).await;
            let err = GithubError::ApiError { status, message };
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("transient GitHub error looking up PR {pr_ref}: {err}. Retrying...");
                Err(BackoffError::transient(err))
            } else {
                Err(BackoffError::permanent(err))
            }
        };

        retry(Self::backoff_config(), operation).await
    }

    async fn merge_pull(&self, pr_ref: &str) -> Result<MergeOutcome> {
        let url = format!("{}/merge", self.pull_url(pr_ref));
        let body = serde_json::json!({ "commit_title": format!("Merge PR #{pr_ref}") });

        // Merging is not idempotent, so unlike the lookup it is never retried.
        let response = self.client.put(&url).json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(MergeOutcome::Merged);
        }

        let message = error_message(response).await;
        match status {
            // The documented "merge declined" statuses.
            StatusCode::NOT_FOUND
            | StatusCode::METHOD_NOT_ALLOWED
            | StatusCode::CONFLICT
            | StatusCode::UNPROCESSABLE_ENTITY => {
                let message = if message.is_empty() { status.to_string() } else { message };
                Ok(MergeOutcome::Rejected { message })
            }
            _ => Err(GithubError::ApiError { status, message }),
        }
    }
}
