use super::*;

#[test]
fn test_new_vercel_client() {
    let client = DefaultVercelClient::new("test_token", "https://api.vercel.com", None, None);
    assert!(client.is_ok());
}

#[test]
fn test_new_vercel_client_rejects_control_chars_in_token() {
    let client = DefaultVercelClient::new("bad\ntoken", "https://api.vercel.com", None, None);
    assert!(matches!(client, Err(VercelError::InvalidHeader(_))));
}

#[test]
fn test_list_response_maps_to_records() {
    let body = r#"{
        "deployments": [
            {
                "uid": "dpl_1",
                "name": "demo",
                "url": "demo-abc.vercel.app",
                "state": "READY",
                "created": 1700000000000,
                "meta": {
                    "githubCommitRef": "main",
                    "githubCommitMessage": "chore: bump deps",
                    "githubCommitSha": "1234567890abcdef1234567890abcdef12345678"
                }
            },
            {
                "uid": "dpl_2",
                "name": "demo",
                "readyState": "BUILDING"
            }
        ]
    }"#;

    let response: DeploymentsResponse = serde_json::from_str(body).unwrap();
    let records: Vec<_> =
        response.deployments.into_iter().map(ApiDeployment::into_record).collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "dpl_1");
    assert_eq!(records[0].state, DeployState::Ready);
    assert_eq!(records[0].branch, "main");
    assert!(records[0].created_at.is_some());
    assert_eq!(records[1].id, "dpl_2");
    assert_eq!(records[1].state, DeployState::Building);
    assert_eq!(records[1].branch, "");
}

#[test]
fn test_single_deployment_uses_id_alias_and_ready_state() {
    let body = r#"{
        "id": "dpl_3",
        "name": "demo",
        "readyState": "ERROR",
        "createdAt": 1700000000000
    }"#;

    let deployment: ApiDeployment = serde_json::from_str(body).unwrap();
    let record = deployment.into_record();

    assert_eq!(record.id, "dpl_3");
    assert_eq!(record.state, DeployState::Error);
    assert!(record.created_at.is_some());
}

#[test]
fn test_empty_list_response() {
    let response: DeploymentsResponse = serde_json::from_str("{}").unwrap();
    assert!(response.deployments.is_empty());
}
