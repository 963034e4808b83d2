//! GitHub contents API client tests against a local HTTP server

use mockito::{Matcher, Server};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use subpull::error::exit_code_of;
use subpull::fetch::{ApiFetch, ContentApi, EntryKind, FetchOptions, GitHubApi, RemoteEntry};
use subpull::progress::EventSink;
use subpull::request::{FetchMode, FetchRequest};
use subpull::system::RealSystem;
use tempfile::TempDir;

fn client(base: &str) -> GitHubApi {
    GitHubApi::new(base, "octo", "hello", Some("secret"), Duration::from_secs(10)).unwrap()
}

fn listing_body(server_url: &str) -> String {
    format!(
        r#"[
  {{"name": "a.txt", "path": "src/lib/a.txt", "type": "file", "download_url": "{server_url}/raw/src/lib/a.txt"}},
  {{"name": "sub", "path": "src/lib/sub", "type": "dir", "download_url": null}},
  {{"name": "vendored", "path": "src/lib/vendored", "type": "submodule", "download_url": null}}
]"#
    )
}

#[tokio::test]
async fn test_list_directory() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/octo/hello/contents/src/lib")
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .match_header("authorization", "Bearer secret")
        .match_header("accept", "application/vnd.github+json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(listing_body(&server.url()))
        .create_async()
        .await;

    let entries = client(&server.url()).list("src/lib", "main").await.unwrap();

    mock.assert_async().await;
    assert_eq!(
        entries,
        vec![
            RemoteEntry::file("src/lib/a.txt", format!("{}/raw/src/lib/a.txt", server.url())),
            RemoteEntry::directory("src/lib/sub"),
        ]
    );
}

#[tokio::test]
async fn test_list_file_path_returns_single_entry() {
    let mut server = Server::new_async().await;
    let _mock1 = server
        .mock("GET", "/repos/octo/hello/contents/README.md")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"name": "README.md", "path": "README.md", "type": "file", "download_url": "https://raw.example.com/README.md"}"#,
        )
        .create_async()
        .await;

    let entries = client(&server.url()).list("README.md", "main").await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::File);
    assert_eq!(entries[0].path, "README.md");
}

#[tokio::test]
async fn test_list_not_found() {
    let mut server = Server::new_async().await;
    let _mock2 = server
        .mock("GET", "/repos/octo/hello/contents/missing")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let err = client(&server.url()).list("missing", "dev").await.unwrap_err();

    assert_eq!(exit_code_of(&err), 3);
    assert!(err.to_string().contains("not found in octo/hello at 'dev'"));
}

#[tokio::test]
async fn test_list_unauthorized() {
    let mut server = Server::new_async().await;
    let _mock3 = server
        .mock("GET", "/repos/octo/hello/contents/src")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message": "Bad credentials"}"#)
        .create_async()
        .await;

    let err = client(&server.url()).list("src", "main").await.unwrap_err();

    assert_eq!(exit_code_of(&err), 3);
    assert!(err.to_string().contains("authentication failed"));
}

#[tokio::test]
async fn test_list_server_error_keeps_body() {
    let mut server = Server::new_async().await;
    let _mock4 = server
        .mock("GET", "/repos/octo/hello/contents/src")
        .match_query(Matcher::Any)
        .with_status(502)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = client(&server.url()).list("src", "main").await.unwrap_err();

    assert_eq!(exit_code_of(&err), 3);
    assert!(err.to_string().contains("upstream unavailable"));
}

#[tokio::test]
async fn test_download_sends_token_and_returns_bytes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/raw/a.txt")
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_body("alpha\n")
        .create_async()
        .await;
    let entry = RemoteEntry::file("a.txt", format!("{}/raw/a.txt", server.url()));

    let bytes = client(&server.url()).download(&entry).await.unwrap();

    mock.assert_async().await;
    assert_eq!(&bytes[..], b"alpha\n");
}

#[tokio::test]
async fn test_download_from_other_host_omits_token() {
    let api_server = Server::new_async().await;
    let mut blob_server = Server::new_async().await;
    let mock = blob_server
        .mock("GET", "/raw/a.txt")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("alpha\n")
        .create_async()
        .await;
    let entry = RemoteEntry::file("a.txt", format!("{}/raw/a.txt", blob_server.url()));

    let bytes = client(&api_server.url()).download(&entry).await.unwrap();

    mock.assert_async().await;
    assert_eq!(&bytes[..], b"alpha\n");
}

#[tokio::test]
async fn test_download_failure() {
    let mut server = Server::new_async().await;
    let _mock5 = server
        .mock("GET", "/raw/a.txt")
        .with_status(500)
        .create_async()
        .await;
    let entry = RemoteEntry::file("a.txt", format!("{}/raw/a.txt", server.url()));

    let err = client(&server.url()).download(&entry).await.unwrap_err();

    assert_eq!(exit_code_of(&err), 4);
    assert!(err.to_string().contains("a.txt"));
}

#[tokio::test]
async fn test_download_without_url() {
    let server = Server::new_async().await;
    let entry = RemoteEntry::directory("src");

    let err = client(&server.url()).download(&entry).await.unwrap_err();
    assert_eq!(exit_code_of(&err), 4);
}

#[tokio::test]
async fn test_engine_fetches_through_http() {
    let mut server = Server::new_async().await;
    let url = server.url();
    let _mock6 = server
        .mock("GET", "/repos/octo/hello/contents/src/lib")
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        .with_body(listing_body(&url))
        .create_async()
        .await;
    let _mock7 = server
        .mock("GET", "/repos/octo/hello/contents/src/lib/sub")
        .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
        .with_status(200)
        .with_body(format!(
            r#"[{{"name": "b.txt", "path": "src/lib/sub/b.txt", "type": "file", "download_url": "{url}/raw/src/lib/sub/b.txt"}}]"#
        ))
        .create_async()
        .await;
    let _mock8 = server
        .mock("GET", "/raw/src/lib/a.txt")
        .with_body("alpha\n")
        .create_async()
        .await;
    let _mock9 = server
        .mock("GET", "/raw/src/lib/sub/b.txt")
        .with_body("beta\n")
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let request = FetchRequest::new(
        "octo",
        "hello",
        "main",
        "src/lib",
        temp_dir.path(),
        FetchMode::Api,
        Some("secret".to_owned()),
    );
    let engine = ApiFetch::new(
        Arc::new(client(&url)),
        Arc::new(RealSystem::new()),
        FetchOptions::default(),
    );

    let outcome = engine.fetch_folder(&request, &EventSink::new()).await.unwrap();

    assert_eq!(outcome.tree.file_count(), 2);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("src/lib/sub/b.txt")).unwrap(),
        "beta\n"
    );
    // The submodule entry is skipped, not created
    assert!(!temp_dir.path().join("src/lib/vendored").exists());
}
