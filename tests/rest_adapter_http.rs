// tests/rest_adapter_http.rs

use std::sync::Arc;

use mockito::Matcher;
use serde_json::json;

use orgseq::errors::SequenceError;
use orgseq::exec::{
    CommandAdapter, Connection, CredentialStore, OrgTarget, RestCommand, RestRequest,
    SalesforceRestAdapter, StepProgress,
};
use orgseq::fs::mock::MockFileSystem;
use orgseq::progress::ProgressNotifier;

const AUTH_DIR: &str = "/home/dev/.sfdx";

fn connection(instance_url: &str) -> Arc<Connection> {
    Arc::new(Connection {
        alias: "demo-scratch".to_string(),
        username: "admin@demo.org".to_string(),
        instance_url: instance_url.to_string(),
        access_token: "token-123".to_string(),
        api_version: "59.0".to_string(),
    })
}

fn auth_cache(instance_url: &str) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        format!("{AUTH_DIR}/alias.json"),
        json!({ "orgs": { "demo-scratch": "admin@demo.org" } }).to_string(),
    );
    fs.add_file(
        format!("{AUTH_DIR}/admin@demo.org.json"),
        json!({
            "accessToken": "token-123",
            "instanceUrl": instance_url,
            "username": "admin@demo.org"
        })
        .to_string(),
    );
    fs
}

fn adapter_for(fs: MockFileSystem) -> SalesforceRestAdapter {
    let store = CredentialStore::new(AUTH_DIR, "59.0", Arc::new(fs));
    SalesforceRestAdapter::new(Arc::new(store))
}

fn progress() -> StepProgress {
    StepProgress::new(None, ProgressNotifier::new(), false)
}

#[tokio::test]
async fn query_is_sent_to_the_versioned_data_api() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/services/data/v59.0/query")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "SELECT Id FROM Profile WHERE Name = 'Standard User'".into(),
        ))
        .match_header("authorization", "Bearer token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"totalSize":1,"records":[{"Id":"00e000000000001AAA"}]}"#)
        .create_async()
        .await;

    let adapter = adapter_for(MockFileSystem::new());
    let cmd = RestCommand::new(
        OrgTarget::Connection(connection(&server.url())),
        RestRequest::query("SELECT Id FROM Profile WHERE Name = 'Standard User'"),
    );

    let body = adapter.run(cmd, &progress()).await.expect("query succeeds");

    assert_eq!(body["records"][0]["Id"], "00e000000000001AAA");
    mock.assert_async().await;
}

#[tokio::test]
async fn services_paths_are_relative_to_the_instance() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/services/oauth2/userinfo")
        .with_status(200)
        .with_body(r#"{"user_id":"005000000000002AAA"}"#)
        .create_async()
        .await;

    let adapter = adapter_for(MockFileSystem::new());
    let cmd = RestCommand::new(
        OrgTarget::Connection(connection(&server.url())),
        RestRequest::get("/services/oauth2/userinfo"),
    );

    let body = adapter.run(cmd, &progress()).await.expect("userinfo");
    assert_eq!(body["user_id"], "005000000000002AAA");
    mock.assert_async().await;
}

#[tokio::test]
async fn json_bodies_are_posted_and_empty_responses_are_null() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/services/data/v59.0/sobjects/User/005000000000002AAA")
        .match_body(Matcher::Json(json!({ "Title": "Admin" })))
        .with_status(204)
        .create_async()
        .await;

    let adapter = adapter_for(MockFileSystem::new());
    let cmd = RestCommand::new(
        OrgTarget::Connection(connection(&server.url())),
        RestRequest::patch("/sobjects/User/005000000000002AAA", json!({ "Title": "Admin" })),
    );

    let body = adapter.run(cmd, &progress()).await.expect("patch");
    assert!(body.is_null());
    mock.assert_async().await;
}

#[tokio::test]
async fn error_status_carries_the_response_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/services/data/v59.0/sobjects/User")
        .with_status(400)
        .with_body(r#"[{"message":"Duplicate Username","errorCode":"DUPLICATE_USERNAME"}]"#)
        .create_async()
        .await;

    let adapter = adapter_for(MockFileSystem::new());
    let cmd = RestCommand::new(
        OrgTarget::Connection(connection(&server.url())),
        RestRequest::post("/sobjects/User", json!({ "Username": "dup@demo.org" })),
    );

    let err = adapter.run(cmd, &progress()).await.expect_err("400");
    match err {
        SequenceError::Http { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("DUPLICATE_USERNAME"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn aliases_authenticate_once_through_the_auth_cache() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/services/oauth2/userinfo")
        .match_header("authorization", "Bearer token-123")
        .with_status(200)
        .with_body(r#"{"user_id":"005000000000002AAA"}"#)
        .expect(2)
        .create_async()
        .await;

    let adapter = adapter_for(auth_cache(&server.url()));
    for _ in 0..2 {
        let cmd = RestCommand::new(
            OrgTarget::Alias("demo-scratch".to_string()),
            RestRequest::get("/services/oauth2/userinfo"),
        );
        adapter.run(cmd, &progress()).await.expect("userinfo");
    }

    assert_eq!(adapter.cached_connections(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn unknown_alias_is_an_auth_error_without_a_request() {
    let adapter = adapter_for(auth_cache("http://127.0.0.1:9"));
    let cmd = RestCommand::new(
        OrgTarget::Alias("nobody".to_string()),
        RestRequest::get("/services/oauth2/userinfo"),
    );

    let err = adapter.run(cmd, &progress()).await.expect_err("unknown alias");
    assert!(matches!(err, SequenceError::Auth(_)), "got {err:?}");
    assert_eq!(adapter.cached_connections(), 0);
}
