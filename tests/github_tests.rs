mod common;

use common::test_helpers::*;
use pretty_assertions::assert_eq;
use portfolio_service::{Cache, FetchError, GitHubClient};
use serde_json::json;

#[tokio::test]
async fn test_fetch_user_profile() {
    let mut server = setup_test_server().await;
    let mock = mock_user(&mut server, "octocat").await;

    let client = test_client(&server, Cache::disabled());
    let profile = client.fetch_user_profile("octocat").await.unwrap();

    assert_eq!(profile.name, "The Octocat");
    assert_eq!(profile.bio, "GitHub's mascot");
    assert_eq!(profile.html_url, "https://github.com/octocat");
    assert_eq!(
        profile.avatar_url,
        "https://avatars.githubusercontent.com/u/583231?v=4"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cache_hit_skips_request() {
    let mut server = setup_test_server().await;
    let mock = server
        .mock("GET", "/users/octocat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(read_test_json("user.json"))
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server, Cache::in_memory());
    let first = client.fetch_user_profile("octocat").await.unwrap();
    let second = client.fetch_user_profile("octocat").await.unwrap();

    assert_eq!(first, second);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_cached_entry_is_keyed_by_endpoint() {
    let mut server = setup_test_server().await;
    let _mock = mock_user(&mut server, "octocat").await;

    let cache = Cache::in_memory();
    let client = test_client(&server, cache.clone());
    client.fetch_user_profile("octocat").await.unwrap();

    let cached = cache.get(&client.user_url("octocat")).await.unwrap();
    assert_eq!(cached["login"], "octocat");
}

#[tokio::test]
async fn test_invalid_cache_entry_is_refetched() {
    let mut server = setup_test_server().await;
    let mock = mock_user(&mut server, "octocat").await;

    let cache = Cache::in_memory();
    let client = test_client(&server, cache.clone());
    cache
        .set(&client.user_url("octocat"), &json!({"login": "octocat"}), portfolio_service::cache::DEFAULT_TTL)
        .await;

    let profile = client.fetch_user_profile("octocat").await.unwrap();
    assert_eq!(profile.name, "The Octocat");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_is_status_error() {
    let mut server = setup_test_server().await;
    let _mock = server
        .mock("GET", "/users/ghost")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let client = test_client(&server, Cache::in_memory());
    let err = client.fetch_user_profile("ghost").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(matches!(err, FetchError::Status { status, .. } if status == 404));
    assert_eq!(err.url(), client.user_url("ghost"));
}

#[tokio::test]
async fn test_schema_mismatch_is_not_cached() {
    let mut server = setup_test_server().await;
    let mock = server
        .mock("GET", "/users/octocat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"login": "octocat", "name": null, "bio": 42}"#)
        .expect(2)
        .create_async()
        .await;

    let cache = Cache::in_memory();
    let client = test_client(&server, cache.clone());

    for _ in 0..2 {
        match client.fetch_user_profile("octocat").await {
            Err(FetchError::Schema { errors, .. }) => {
                assert!(errors.has_path("name"));
                assert!(errors.has_path("bio"));
                assert!(errors.has_path("avatar_url"));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }
    assert!(cache.get(&client.user_url("octocat")).await.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_undecodable_body() {
    let mut server = setup_test_server().await;
    let _mock = server
        .mock("GET", "/users/octocat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("<html>rate limited</html>")
        .create_async()
        .await;

    let client = test_client(&server, Cache::disabled());
    let err = client.fetch_user_profile("octocat").await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_api_is_network_error() {
    let client = GitHubClient::new(None, Cache::disabled())
        .unwrap()
        .with_api_base("http://127.0.0.1:1");

    let err = client.fetch_user_profile("octocat").await.unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_token_sent_as_bearer() {
    let mut server = setup_test_server().await;
    let mock = server
        .mock("GET", "/users/octocat")
        .match_header("authorization", "Bearer secret-token")
        .match_header("accept", "application/vnd.github+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(read_test_json("user.json"))
        .create_async()
        .await;

    let client = GitHubClient::new(Some("secret-token".to_string()), Cache::disabled())
        .unwrap()
        .with_api_base(server.url());
    client.fetch_user_profile("octocat").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_token_sends_no_authorization() {
    let mut server = setup_test_server().await;
    let mock = server
        .mock("GET", "/users/octocat")
        .match_header("authorization", mockito::Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(read_test_json("user.json"))
        .create_async()
        .await;

    let client = GitHubClient::new(Some("  ".to_string()), Cache::disabled())
        .unwrap()
        .with_api_base(server.url());
    client.fetch_user_profile("octocat").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_repository_merges_languages() {
    let mut server = setup_test_server().await;
    let (repository, languages) = mock_repository(&mut server, "octocat/hello-world").await;

    let client = test_client(&server, Cache::disabled());
    let info = client.fetch_repository_info("octocat/hello-world").await.unwrap();

    assert_eq!(info.name, "hello-world");
    assert_eq!(info.homepage.as_deref(), Some("https://hello.example.com"));
    assert_eq!(info.language.as_deref(), Some("Rust"));
    assert_eq!(
        info.languages,
        Some(vec!["Rust".to_string(), "Shell".to_string(), "Dockerfile".to_string()])
    );
    repository.assert_async().await;
    languages.assert_async().await;
}

#[tokio::test]
async fn test_repository_cache_covers_languages() {
    let mut server = setup_test_server().await;
    let body = repository_body(&server, "octocat/hello-world").to_string();
    let repository = server
        .mock("GET", "/repos/octocat/hello-world")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .expect(1)
        .create_async()
        .await;
    let languages = server
        .mock("GET", "/repos/octocat/hello-world/languages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Go": 10}"#)
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server, Cache::in_memory());
    client.fetch_repository_info("octocat/hello-world").await.unwrap();
    let cached = client.fetch_repository_info("octocat/hello-world").await.unwrap();

    assert_eq!(cached.languages, Some(vec!["Go".to_string()]));
    repository.assert_async().await;
    languages.assert_async().await;
}

#[tokio::test]
async fn test_languages_failure_fails_repository() {
    let mut server = setup_test_server().await;
    let body = repository_body(&server, "octocat/hello-world").to_string();
    let _repository = server
        .mock("GET", "/repos/octocat/hello-world")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;
    let _languages = server
        .mock("GET", "/repos/octocat/hello-world/languages")
        .with_status(500)
        .create_async()
        .await;

    let cache = Cache::in_memory();
    let client = test_client(&server, cache.clone());
    let err = client.fetch_repository_info("octocat/hello-world").await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status, .. } if status == 500));
    assert!(err.url().ends_with("/languages"));
    assert!(cache.get(&client.repository_url("octocat/hello-world")).await.is_none());
}

#[tokio::test]
async fn test_repository_with_null_fields() {
    let mut server = setup_test_server().await;
    let mut body = repository_body(&server, "octocat/spoon-knife");
    body["description"] = json!(null);
    body["homepage"] = json!(null);
    body["language"] = json!(null);
    let _repository = server
        .mock("GET", "/repos/octocat/spoon-knife")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;
    let _languages = server
        .mock("GET", "/repos/octocat/spoon-knife/languages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let client = test_client(&server, Cache::disabled());
    let info = client.fetch_repository_info("octocat/spoon-knife").await.unwrap();

    assert_eq!(info.description, None);
    assert_eq!(info.homepage, None);
    assert_eq!(info.language, None);
    assert_eq!(info.languages, Some(vec![]));
}
