use super::*;

#[test]
fn test_new_github_client() {
    let client = DefaultGithubClient::new("test_token", "https://api.github.com", "owner/repo");
    assert!(client.is_ok());
}

#[test]
fn test_new_github_client_rejects_control_chars_in_token() {
    let client = DefaultGithubClient::new("bad\ntoken", "https://api.github.com", "owner/repo");
    assert!(matches!(client, Err(GithubError::InvalidHeader(_))));
}

#[test]
fn test_pull_url_strips_trailing_slash() {
    let client =
        DefaultGithubClient::new("t", "https://api.github.com/", "owner/repo").unwrap();
    assert_eq!(client.pull_url("42"), "https://api.github.com/repos/owner/repo/pulls/42");
}

#[test]
fn test_pull_request_deserializes_from_api_shape() {
    let body = r#"{
        "number": 42,
        "title": "Add retry to the poller",
        "state": "open",
        "user": { "login": "someone" }
    }"#;

    let pull: PullRequest = serde_json::from_str(body).unwrap();

    assert_eq!(pull.number, 42);
    assert_eq!(pull.title, "Add retry to the poller");
}

#[test]
fn test_api_error_display_includes_status_and_message() {
    let err = GithubError::ApiError {
        status: StatusCode::CONFLICT,
        message: "merge conflict".to_string(),
    };

    let text = err.to_string();
    assert!(text.contains("409"));
    assert!(text.contains("merge conflict"));
}
