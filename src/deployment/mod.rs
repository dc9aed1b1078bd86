
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding an inbound deployment webhook payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload matched none of the known Vercel webhook shapes.
    #[error("deployment payload did not match any known shape")]
    UnknownShape,
}

/// Lifecycle state of a Vercel deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeployState {
    /// Waiting for a build slot.
    Queued,
    /// Build in progress.
    Building,
    /// Built and serving traffic.
    Ready,
    /// Build or deployment failed.
    Error,
    /// Cancelled before completion.
    Canceled,
    /// Anything the API may add later.
    #[default]
    Unknown,
}

impl DeployState {
    /// Maps the `state`/`readyState` strings of the Vercel API.
    pub fn from_api(value: &str) -> Self {
        match value {
            "QUEUED" | "INITIALIZING" => Self::Queued,
            "BUILDING" => Self::Building,
            "READY" => Self::Ready,
            "ERROR" => Self::Error,
            "CANCELED" => Self::Canceled,
            _ => Self::Unknown,
        }
    }
}

/// Immutable snapshot of a single deployment, as fetched from the API or
/// decoded from a webhook event. `id` is the deduplication key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentRecord {
    /// Opaque deployment identifier (`dpl_…`).
    pub id: String,
    /// Lifecycle state at the time of the snapshot.
    pub state: DeployState,
    /// Vercel project name.
    pub project_name: String,
    /// Deployment host, usually without a scheme.
    pub url: String,
    /// Git branch the deployment was built from.
    pub branch: String,
    /// Commit message of the deployed commit.
    pub commit_message: String,
    /// Full commit hash of the deployed commit.
    pub commit_sha: String,
    /// Creation time, when the payload carried one.
    pub created_at: Option<DateTime<Utc>>,
}

impl DeploymentRecord {
    /// Decodes a webhook payload into a record.
    ///
    /// Vercel event payloads have shifted shape over time (`payload`,
    /// `payload.payload`, `payload.deployment`), so each known nesting is
    /// tried in order; the first candidate carrying a deployment id wins.
    pub fn from_webhook(value: &Value) -> Result<Self, PayloadError> {
        let state_hint = value.get("type").and_then(Value::as_str).and_then(state_from_event);

        let candidates = [
            value.pointer("/payload/deployment"),
            value.pointer("/payload/payload"),
            value.get("payload"),
            Some(value),
        ];

        for candidate in candidates.into_iter().flatten() {
            let Some(mut record) = Self::from_value(candidate, state_hint) else {
                continue;
            };
            // The project name often lives next to the deployment object
            // rather than inside it.
            if record.project_name.is_empty() {
                if let Some(name) = value
                    .pointer("/payload/name")
                    .or_else(|| value.get("name"))
                    .and_then(Value::as_str)
                {
                    record.project_name = name.to_string();
                }
            }
            return Ok(record);
        }

        Err(PayloadError::UnknownShape)
    }

    /// Builds a record from a single candidate object. `None` when the
    /// object carries no deployment id.
    fn from_value(object: &Value, state_hint: Option<DeployState>) -> Option<Self> {
        let id = object
            .get("id")
            .or_else(|| object.get("uid"))
            .and_then(Value::as_str)?
            .to_string();

        let state = state_hint
            .or_else(|| {
                object
                    .get("readyState")
                    .or_else(|| object.get("state"))
                    .and_then(Value::as_str)
                    .map(DeployState::from_api)
            })
            .unwrap_or(DeployState::Unknown);

        let meta = object.get("meta");
        let meta_str = |key: &str| {
            meta.and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let created_at = object
            .get("createdAt")
            .or_else(|| object.get("created"))
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis);

        Some(Self {
            id,
            state,
            project_name: object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            url: object.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
            branch: meta_str("githubCommitRef"),
            commit_message: meta_str("githubCommitMessage"),
            commit_sha: meta_str("githubCommitSha"),
            created_at,
        })
    }
}

/// Derives a state from the webhook event name, when it implies one.
fn state_from_event(event: &str) -> Option<DeployState> {
    match event {
        "deployment.succeeded" | "deployment.ready" => Some(DeployState::Ready),
        "deployment.error" => Some(DeployState::Error),
        "deployment.canceled" => Some(DeployState::Canceled),
        "deployment.created" => Some(DeployState::Queued),
        _ => None,
    }
}
