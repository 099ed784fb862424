//! Workspace download tests
//!
//! Tests for listing-backed downloads and result file saving:
//! - Downloads of listed and unlisted paths
//! - Session expiry with and without recovery
//! - Local file naming

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{FakeBackend, test_config};
use crewlink_core::{ChatClient, Config, Error, ResultFile};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn ready_client(files: &[&str]) -> (ChatClient, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::default());
    backend.set_files(files);
    let client = ChatClient::new(backend.clone(), &test_config(60));
    assert!(client.initialize().await);
    (client, backend)
}

fn http_client(server: &MockServer) -> ChatClient {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    ChatClient::from_config(&config).unwrap()
}

mod fake_backend_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_selected_file() {
        let dir = TempDir::new().unwrap();
        let (client, backend) = ready_client(&["a.txt", "b.txt"]).await;
        client.select_workspace_file(1).unwrap();

        let target = client.download_workspace_file(dir.path()).await.unwrap();
        assert_eq!(target, dir.path().join("b.txt"));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "contents of b.txt");
        assert_eq!(backend.downloads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nested_path_saves_under_last_segment() {
        let dir = TempDir::new().unwrap();
        let (client, _) = ready_client(&["docs/outline.txt"]).await;

        let target = client.download_workspace_file(dir.path()).await.unwrap();
        assert_eq!(target, dir.path().join("outline.txt"));
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_unlisted_path_is_not_requested() {
        let dir = TempDir::new().unwrap();
        let (client, backend) = ready_client(&["a.txt"]).await;

        let result = client.download_workspace_path("ghost.txt", dir.path()).await;
        match result {
            Err(Error::DownloadFileMissing(path)) => assert_eq!(path, "ghost.txt"),
            other => panic!("Expected DownloadFileMissing, got {:?}", other),
        }
        assert_eq!(backend.downloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nothing_selected() {
        let dir = TempDir::new().unwrap();
        let (client, _) = ready_client(&[]).await;

        assert!(matches!(
            client.download_workspace_file(dir.path()).await,
            Err(Error::NoSelection(_))
        ));
        assert!(client.select_workspace_file(0).is_err());
    }

    #[tokio::test]
    async fn test_save_selected_result() {
        let dir = TempDir::new().unwrap();
        let (client, _) = ready_client(&[]).await;
        client.set_result_files(vec![
            ResultFile::new("summary.md", "# Summary"),
            ResultFile::new("data.csv", "a,b\n1,2\n"),
        ]);

        assert!(matches!(client.save_result(dir.path()).await, Err(Error::NoSelection(_))));

        client.select_result_file(1).unwrap();
        let target = client.save_result(dir.path()).await.unwrap();
        assert_eq!(target, dir.path().join("data.csv"));
        assert_eq!(std::fs::read_to_string(target).unwrap(), "a,b\n1,2\n");
    }
}

mod http_download_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_over_http() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).insert_header("X-Session-ID", "s1"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("session_id", "s1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": ["out/report.md"] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .and(query_param("session_id", "s1"))
            .and(query_param("file_path", "out/report.md"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"# Report\n".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = http_client(&server);
        assert!(client.initialize().await);

        let target = client.download_workspace_file(dir.path()).await.unwrap();
        assert_eq!(target, dir.path().join("report.md"));
        assert_eq!(std::fs::read(&target).unwrap(), b"# Report\n");
    }

    #[tokio::test]
    async fn test_expired_session_is_recovered() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("session_id", "old"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(200).insert_header("X-Session-ID", "new"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("session_id", "new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": ["fresh.txt"] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = http_client(&server).with_session_id("old");
        let result = client.download_workspace_path("stale.txt", dir.path()).await;

        assert!(matches!(result, Err(Error::DownloadSessionExpired { recovered: true })));
        let snapshot = client.snapshot();
        assert_eq!(snapshot.session_id, "new");
        assert_eq!(snapshot.selected_workspace_path(), Some("fresh.txt"));
    }

    #[tokio::test]
    async fn test_expired_session_not_recovered() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = http_client(&server).with_session_id("old");
        let result = client.download_workspace_path("a.txt", dir.path()).await;

        assert!(matches!(result, Err(Error::DownloadSessionExpired { recovered: false })));
        assert_eq!(client.session_id(), "old");
    }
}
