use teloxide::utils::html;

use crate::deployment::{DeployState, DeploymentRecord};

/// Emoji marker for a deployment lifecycle state.
pub fn state_emoji(state: DeployState) -> &'static str {
    match state {
        DeployState::Ready => "✅",
        DeployState::Error => "❌",
        DeployState::Building => "🏗",
        DeployState::Queued => "⏳",
        DeployState::Canceled => "🛑",
        DeployState::Unknown => "❔",
    }
}

fn state_label(state: DeployState) -> &'static str {
    match state {
        DeployState::Ready => "Ready",
        DeployState::Error => "Error",
        DeployState::Building => "Building",
        DeployState::Queued => "Queued",
        DeployState::Canceled => "Canceled",
        DeployState::Unknown => "Unknown",
    }
}

/// First 7 characters of a commit hash, or the whole hash if shorter.
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

/// Renders a deployment into a Telegram HTML message body.
pub fn deployment_message(record: &DeploymentRecord) -> String {
    let mut lines = vec![format!(
        "{} <b>{}</b> — {}",
        state_emoji(record.state),
        html::escape(&record.project_name),
        state_label(record.state),
    )];

    if !record.branch.is_empty() {
        lines.push(format!("🌿 <code>{}</code>", html::escape(&record.branch)));
    }
    if !record.commit_message.is_empty() || !record.commit_sha.is_empty() {
        lines.push(format!(
            "📝 {} (<code>{}</code>)",
            html::escape(&record.commit_message),
            html::escape(short_sha(&record.commit_sha)),
        ));
    }
    if !record.url.is_empty() {
        // The API reports bare hosts; webhook payloads sometimes include
        // the scheme already.
        let url = if record.url.starts_with("http") {
            record.url.clone()
        } else {
            format!("https://{}", record.url)
        };
        lines.push(format!("🔗 {url}"));
    }
    if let Some(created_at) = record.created_at {
        lines.push(format!("🕒 {}", created_at.format("%Y-%m-%d %H:%M UTC")));
    }

    lines.join("\n")
}
