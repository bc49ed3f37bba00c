#![allow(dead_code)]

use std::path::PathBuf;
use mockito::{Mock, Server, ServerGuard};
use portfolio_service::{Cache, GitHubClient};
use serde_json::{json, Value};

pub mod test_helpers {
    use super::*;

    pub async fn setup_test_server() -> ServerGuard {
        Server::new_async().await
    }

    pub fn get_test_data_path(file: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data").join(file)
    }

    pub fn read_test_json(file: &str) -> String {
        std::fs::read_to_string(get_test_data_path(file))
            .expect("Failed to read test data")
    }

    /// Client pointed at the mock server, without a token
    pub fn test_client(server: &ServerGuard, cache: Cache) -> GitHubClient {
        GitHubClient::new(None, cache)
            .expect("Failed to build client")
            .with_api_base(server.url())
    }

    /// Repository body whose `languages_url` points back at the mock server
    pub fn repository_body(server: &ServerGuard, owner_repo: &str) -> Value {
        let name = owner_repo.rsplit('/').next().unwrap_or(owner_repo);
        json!({
            "id": 1296269,
            "name": name,
            "full_name": owner_repo,
            "html_url": format!("https://github.com/{}", owner_repo),
            "description": "My first repository on GitHub!",
            "languages_url": format!("{}/repos/{}/languages", server.url(), owner_repo),
            "created_at": "2011-01-26T19:01:12Z",
            "updated_at": "2024-01-22T12:14:03Z",
            "homepage": "https://hello.example.com",
            "language": "Rust",
            "stargazers_count": 80
        })
    }

    pub async fn mock_user(server: &mut ServerGuard, username: &str) -> Mock {
        server
            .mock("GET", format!("/users/{}", username).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(read_test_json("user.json"))
            .create_async()
            .await
    }

    /// Mocks the repository endpoint and its language breakdown
    pub async fn mock_repository(server: &mut ServerGuard, owner_repo: &str) -> (Mock, Mock) {
        let body = repository_body(server, owner_repo).to_string();
        let repository = server
            .mock("GET", format!("/repos/{}", owner_repo).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;
        let languages = server
            .mock("GET", format!("/repos/{}/languages", owner_repo).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Rust": 12000, "Shell": 300, "Dockerfile": 40}"#)
            .create_async()
            .await;
        (repository, languages)
    }

    pub fn setup_test_logger() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("portfolio_service=debug")
            .with_test_writer()
            .try_init();
    }
}
