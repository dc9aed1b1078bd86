use chrono::DateTime;

use super::format::*;
use crate::deployment::{DeployState, DeploymentRecord};

#[test]
fn test_deployment_message_contains_the_essentials() {
    let record = DeploymentRecord {
        id: "dpl_1".into(),
        state: DeployState::Ready,
        project_name: "demo".into(),
        url: "demo-abc.vercel.app".into(),
        branch: "main".into(),
        commit_message: "fix: a thing".into(),
        commit_sha: "1234567890abcdef".into(),
        created_at: DateTime::from_timestamp_millis(1_700_000_000_000),
    };

    let text = deployment_message(&record);

    assert!(text.contains("✅"));
    assert!(text.contains("demo"));
    assert!(text.contains("main"));
    assert!(text.contains("1234567"));
    assert!(!text.contains("1234567890abcdef"));
    assert!(text.contains("https://demo-abc.vercel.app"));
}

#[test]
fn test_deployment_message_escapes_html() {
    let record = DeploymentRecord {
        id: "dpl_2".into(),
        state: DeployState::Error,
        project_name: "demo <script>".into(),
        commit_message: "feat: a & b".into(),
        commit_sha: "abcdef1".into(),
        ..Default::default()
    };

    let text = deployment_message(&record);

    assert!(text.contains("&lt;script&gt;"));
    assert!(text.contains("a &amp; b"));
}

#[test]
fn test_deployment_message_skips_empty_fields() {
    let record = DeploymentRecord {
        id: "dpl_3".into(),
        state: DeployState::Canceled,
        project_name: "demo".into(),
        ..Default::default()
    };

    let text = deployment_message(&record);

    assert!(!text.contains("🌿"));
    assert!(!text.contains("📝"));
    assert!(!text.contains("🔗"));
}

#[test]
fn test_short_sha_handles_short_input() {
    assert_eq!(short_sha("1234567890abcdef"), "1234567");
    assert_eq!(short_sha("abc"), "abc");
    assert_eq!(short_sha(""), "");
}

#[test]
fn test_state_emoji_mapping() {
    assert_eq!(state_emoji(DeployState::Ready), "✅");
    assert_eq!(state_emoji(DeployState::Error), "❌");
    assert_eq!(state_emoji(DeployState::Building), "🏗");
    assert_eq!(state_emoji(DeployState::Queued), "⏳");
    assert_eq!(state_emoji(DeployState::Canceled), "🛑");
    assert_eq!(state_emoji(DeployState::Unknown), "❔");
}
