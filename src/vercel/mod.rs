#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use backoff::{Error as BackoffError, ExponentialBackoff, future::retry};
use chrono::DateTime;
use mockall::automock;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::Deserialize;
use thiserror::Error;

use crate::deployment::{DeployState, DeploymentRecord};

/// Errors from the Vercel REST API.
#[derive(Debug, Error)]
pub enum VercelError {
    /// The configured token could not be turned into a header.
    #[error("invalid Vercel token header")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    /// Transport-level failure (connect, timeout, body read).
    #[error("Vercel request failed: {source}")]
    RequestError {
        /// The underlying reqwest error.
        #[from]
        source: reqwest::Error,
    },
    /// Non-success response.
    #[error("Vercel API returned HTTP {status}: {message}")]
    ApiError {
        /// HTTP status of the response.
        status: StatusCode,
        /// Error body, when readable.
        message: String,
    },
}

type Result<T> = std::result::Result<T, VercelError>;

#[automock]
#[async_trait]
pub trait VercelClient: Send + Sync {
    /// Most recent deployments, newest first, bounded by `limit`.
    async fn recent_deployments(&self, limit: usize) -> Result<Vec<DeploymentRecord>>;

    /// A single deployment by id. `None` when it does not exist.
    async fn deployment(&self, id: &str) -> Result<Option<DeploymentRecord>>;
}

/// REST client scoped to an optional project and team.
#[derive(Clone)]
pub struct DefaultVercelClient {
    client: Client,
    api_url: String,
    project_id: Option<String>,
    team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeploymentsResponse {
    #[serde(default)]
    deployments: Vec<ApiDeployment>,
}

/// Wire shape shared by the v6 list endpoint (`uid`) and the v13 single
/// deployment endpoint (`id`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiDeployment {
    #[serde(alias = "id")]
    uid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    ready_state: Option<String>,
    #[serde(default, alias = "createdAt")]
    created: Option<i64>,
    #[serde(default)]
    meta: Option<DeploymentMeta>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentMeta {
    #[serde(default)]
    github_commit_ref: Option<String>,
    #[serde(default)]
    github_commit_message: Option<String>,
    #[serde(default)]
    github_commit_sha: Option<String>,
}

impl ApiDeployment {
    fn into_record(self) -> DeploymentRecord {
        let state = self
            .ready_state
            .or(self.state)
            .map(|s| DeployState::from_api(&s))
            .unwrap_or_default();
        let meta = self.meta.unwrap_or_default();

        DeploymentRecord {
            id: self.uid,
            state,
            project_name: self.name.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            branch: meta.github_commit_ref.unwrap_or_default(),
            commit_message: meta.github_commit_message.unwrap_or_default(),
            commit_sha: meta.github_commit_sha.unwrap_or_default(),
            created_at: self.created.and_then(DateTime::from_timestamp_millis),
        }
    }
}

impl DefaultVercelClient {
    /// Creates a client. `project_id`/`team_id` narrow the deployment list
    /// the way the dashboard scopes it.
    pub fn new(
        vercel_token: &str,
        api_url: &str,
        project_id: Option<String>,
        team_id: Option<String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {vercel_token}"))?);
        headers.insert(USER_AGENT, HeaderValue::from_static("deploy-relay-bot"));

        let client = Client::builder().default_headers(headers).build()?;
        tracing::debug!("Vercel HTTP client built successfully");

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            project_id,
            team_id,
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

    /// Sends one GET and classifies failures for the retry loop.
    async fn get_json<T>(&self, url: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let operation = || async {
            let response =
                self.client.get(url).query(query).send().await.map_err(|e| {
                    tracing::warn!("network error calling Vercel: {e}. Retrying...");
                    BackoffError::transient(VercelError::from(e))
                })?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                let err = VercelError::ApiError { status, message };
                return if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!("transient Vercel error: {err}. Retrying...");
                    Err(BackoffError::transient(err))
                } else {
                    Err(BackoffError::permanent(err))
                };
            }

            response
                .json::<T>()
                .await
                .map_err(|e| BackoffError::permanent(VercelError::from(e)))
        };

        retry(Self::backoff_config(), operation).await
    }
}

#[async_trait]
impl VercelClient for DefaultVercelClient {
    async fn recent_deployments(&self, limit: usize) -> Result<Vec<DeploymentRecord>> {
        let url = format!("{}/v6/deployments", self.api_url);
        let mut query = vec![("limit", limit.to_string())];
        if let Some(project_id) = &self.project_id {
            query.push(("projectId", project_id.clone()));
        }
        if let Some(team_id) = &self.team_id {
            query.push(("teamId", team_id.clone()));
        }

        let response: DeploymentsResponse = self.get_json(&url, &query).await?;
        Ok(response.deployments.into_iter().map(ApiDeployment::into_record).collect())
    }

    async fn deployment(&self, id: &str) -> Result<Option<DeploymentRecord>> {
        let url = format!("{}/v13/deployments/{}", self.api_url, id);
        let mut query = Vec::new();
        if let Some(team_id) = &self.team_id {
            query.push(("teamId", team_id.clone()));
        }

        match self.get_json::<ApiDeployment>(&url, &query).await {
            Ok(deployment) => Ok(Some(deployment.into_record())),
            Err(VercelError::ApiError { status, .. }) if status == StatusCode::NOT_FOUND => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
