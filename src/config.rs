use std::env::{self, VarError};

use teloxide::types::ChatId;

use crate::tracker::NotifyPolicy;

const DEFAULT_BOT_NAME: &str = "deploy_relay_bot";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_VERCEL_API_URL: &str = "https://api.vercel.com";
const DEFAULT_PORT: u16 = 8443;
const DEFAULT_POLL_INTERVAL: u64 = 60;
const DEFAULT_POLL_PAGE_SIZE: usize = 5;
const DEFAULT_NOTIFIED_RETENTION_HOURS: u64 = 24;
const DEFAULT_STOP_TIMEOUT_SECS: u64 = 5;

/// Represents the application configuration.
#[derive(Debug)]
pub struct Config {
    /// The Telegram bot token.
    pub telegram_bot_token: String,
    /// Destination chat for deployment notifications, when configured.
    pub telegram_chat_id: Option<ChatId>,
    /// Bot username, used when parsing commands.
    pub bot_name: String,
    /// The GitHub API token.
    pub github_token: String,
    /// Repository slug (`owner/name`) targeted by the pull command.
    pub github_repo: String,
    /// Base URL of the GitHub REST API.
    pub github_api_url: String,
    /// The Vercel API token.
    pub vercel_token: String,
    /// Base URL of the Vercel REST API.
    pub vercel_api_url: String,
    /// Project filter for the deployment listing.
    pub vercel_project_id: Option<String>,
    /// Team filter for the deployment listing.
    pub vercel_team_id: Option<String>,
    /// Public base URL registered with Telegram for webhook delivery.
    pub webhook_host: String,
    /// Secret path segment of the Telegram webhook route.
    pub webhook_secret: String,
    /// Port the webhook server listens on.
    pub port: u16,
    /// The interval in seconds between deployment poll ticks.
    pub poll_interval: u64,
    /// How many recent deployments each poll tick examines.
    pub poll_page_size: usize,
    /// Which deployment states produce notifications.
    pub notify_policy: NotifyPolicy,
    /// Hours before a notified deployment id is forgotten.
    pub notified_retention_hours: u64,
    /// Seconds the task loop gets to drain at shutdown.
    pub stop_timeout_secs: u64,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    pub fn from_env() -> Result<Self, VarError> {
        Ok(Self {
            telegram_bot_token: env::var("TELOXIDE_TOKEN")?,
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(ChatId),
            bot_name: env::var("BOT_NAME").unwrap_or_else(|_| DEFAULT_BOT_NAME.to_string()),
            github_token: env::var("GITHUB_TOKEN")?,
            github_repo: env::var("GITHUB_REPO")?,
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string()),
            vercel_token: env::var("VERCEL_TOKEN")?,
            vercel_api_url: env::var("VERCEL_API_URL")
                .unwrap_or_else(|_| DEFAULT_VERCEL_API_URL.to_string()),
            vercel_project_id: env::var("VERCEL_PROJECT_ID").ok(),
            vercel_team_id: env::var("VERCEL_TEAM_ID").ok(),
            webhook_host: env::var("WEBHOOK_HOST")?,
            webhook_secret: env::var("WEBHOOK_SECRET")?,
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_PORT),
            poll_interval: env::var("POLL_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            poll_page_size: env::var("POLL_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLL_PAGE_SIZE),
            notify_policy: env::var("NOTIFY_POLICY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            notified_retention_hours: env::var("NOTIFIED_RETENTION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_NOTIFIED_RETENTION_HOURS),
            stop_timeout_secs: env::var("STOP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_STOP_TIMEOUT_SECS),
        })
    }
}

#[cfg(test)]
mod tests {
    use temp_env::with_vars;

    use super::*;

    const REQUIRED: [(&str, Option<&str>); 6] = [
        ("TELOXIDE_TOKEN", Some("test telegram bot token")),
        ("GITHUB_TOKEN", Some("test github token")),
        ("GITHUB_REPO", Some("owner/repo")),
        ("VERCEL_TOKEN", Some("test vercel token")),
        ("WEBHOOK_HOST", Some("https://bot.example.com")),
        ("WEBHOOK_SECRET", Some("hook-secret")),
    ];

    #[test]
    fn test_from_env() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("TELEGRAM_CHAT_ID", Some("123456")),
            ("POLL_INTERVAL", Some("100")),
            ("POLL_PAGE_SIZE", Some("3")),
            ("NOTIFY_POLICY", Some("verbose")),
            ("PORT", Some("8080")),
        ]);

        with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.telegram_bot_token, "test telegram bot token");
            assert_eq!(config.telegram_chat_id, Some(ChatId(123456)));
            assert_eq!(config.github_repo, "owner/repo");
            assert_eq!(config.webhook_secret, "hook-secret");
            assert_eq!(config.poll_interval, 100);
            assert_eq!(config.poll_page_size, 3);
            assert_eq!(config.notify_policy, NotifyPolicy::Verbose);
            assert_eq!(config.port, 8080);
        });
    }

    #[test]
    fn test_missing_telegram_bot_token_error() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("TELOXIDE_TOKEN", None);

        with_vars(vars, || {
            let config = Config::from_env();
            assert!(config.is_err());
        });
    }

    #[test]
    fn test_missing_github_repo_error() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("GITHUB_REPO", None);

        with_vars(vars, || {
            let config = Config::from_env();
            assert!(config.is_err());
        });
    }

    #[test]
    fn test_defaults_applied_when_optional_vars_missing() {
        with_vars(REQUIRED, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.telegram_chat_id, None);
            assert_eq!(config.bot_name, DEFAULT_BOT_NAME);
            assert_eq!(config.github_api_url, DEFAULT_GITHUB_API_URL);
            assert_eq!(config.vercel_api_url, DEFAULT_VERCEL_API_URL);
            assert_eq!(config.port, DEFAULT_PORT);
            assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
            assert_eq!(config.poll_page_size, DEFAULT_POLL_PAGE_SIZE);
            assert_eq!(config.notify_policy, NotifyPolicy::Terminal);
            assert_eq!(config.notified_retention_hours, DEFAULT_NOTIFIED_RETENTION_HOURS);
            assert_eq!(config.stop_timeout_secs, DEFAULT_STOP_TIMEOUT_SECS);
        });
    }

    #[test]
    fn test_unparseable_chat_id_is_dropped() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TELEGRAM_CHAT_ID", Some("not-a-number")));

        with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.telegram_chat_id, None);
        });
    }

    #[test]
    fn test_unknown_notify_policy_falls_back_to_terminal() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("NOTIFY_POLICY", Some("everything")));

        with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.notify_policy, NotifyPolicy::Terminal);
        });
    }
}
