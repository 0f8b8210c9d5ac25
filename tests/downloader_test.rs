//! Integration tests for the streaming downloader.

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use imgur_rescue::config::Config;
use imgur_rescue::downloader::{self, DownloadError};
use imgur_rescue::log_sink::MemoryLog;
use imgur_rescue::resolver::ArchiveRecord;

fn test_config(dir: &TempDir) -> Config {
    Config {
        download_dir: dir.path().to_path_buf(),
        ..Config::for_testing()
    }
}

async fn mount_capture(server: &MockServer, route: &str, body: &[u8], content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_commits_and_suffixes_collisions() {
    let server = MockServer::start().await;
    mount_capture(&server, "/capture", b"first bytes", "image/jpeg").await;

    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let client = reqwest::Client::new();
    let cancel = CancellationToken::new();
    let sink = MemoryLog::new();
    let record = ArchiveRecord {
        archive_url: format!("{}/capture", server.uri()),
        fallback_ext: ".jpg".to_string(),
    };

    let first = downloader::download(&client, &config, &record, "abc12", &cancel, &sink)
        .await
        .expect("first download should succeed");
    assert_eq!(first, dir.path().join("abc12.jpg"));
    assert_eq!(tokio::fs::read(&first).await.unwrap(), b"first bytes");

    let second = downloader::download(&client, &config, &record, "abc12", &cancel, &sink)
        .await
        .expect("second download should succeed");
    assert_eq!(second, dir.path().join("abc12_2.jpg"));

    let third = downloader::download(&client, &config, &record, "abc12", &cancel, &sink)
        .await
        .expect("third download should succeed");
    assert_eq!(third, dir.path().join("abc12_3.jpg"));

    // No temp files left behind.
    let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        let name = entry.file_name().to_string_lossy().to_string();
        assert!(!name.ends_with(".tmp"), "leftover temp file: {name}");
    }
}

#[tokio::test]
async fn test_content_type_overrides_fallback_extension() {
    let server = MockServer::start().await;
    mount_capture(&server, "/capture", b"video bytes", "video/mp4").await;

    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let client = reqwest::Client::new();
    let cancel = CancellationToken::new();
    let sink = MemoryLog::new();
    let record = ArchiveRecord {
        archive_url: format!("{}/capture", server.uri()),
        fallback_ext: ".gifv".to_string(),
    };

    let saved = downloader::download(&client, &config, &record, "abc12", &cancel, &sink)
        .await
        .expect("download should succeed");

    assert_eq!(saved, dir.path().join("abc12.mp4"));
    assert!(sink.contains("Server reports file type '.mp4'"));
}

#[tokio::test]
async fn test_unknown_content_type_keeps_fallback_extension() {
    let server = MockServer::start().await;
    mount_capture(&server, "/capture", b"opaque", "application/octet-stream").await;

    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let client = reqwest::Client::new();
    let cancel = CancellationToken::new();
    let sink = MemoryLog::new();
    let record = ArchiveRecord {
        archive_url: format!("{}/capture", server.uri()),
        fallback_ext: ".gifv".to_string(),
    };

    let saved = downloader::download(&client, &config, &record, "abc12", &cancel, &sink)
        .await
        .expect("download should succeed");

    assert_eq!(saved, dir.path().join("abc12.gifv"));
}

#[tokio::test]
async fn test_error_status_fails_without_writing_a_final_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let client = reqwest::Client::new();
    let cancel = CancellationToken::new();
    let sink = MemoryLog::new();
    let record = ArchiveRecord {
        archive_url: format!("{}/capture", server.uri()),
        fallback_ext: ".jpg".to_string(),
    };

    let result = downloader::download(&client, &config, &record, "abc12", &cancel, &sink).await;

    assert!(matches!(result, Err(DownloadError::BadStatus(status)) if status.as_u16() == 404));
    assert!(!dir.path().join("abc12.jpg").exists());
}

#[tokio::test]
async fn test_cancelled_before_start_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/capture"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let config = test_config(&dir);
    let client = reqwest::Client::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = MemoryLog::new();
    let record = ArchiveRecord {
        archive_url: format!("{}/capture", server.uri()),
        fallback_ext: ".jpg".to_string(),
    };

    let result = downloader::download(&client, &config, &record, "abc12", &cancel, &sink).await;

    assert!(matches!(result, Err(DownloadError::Cancelled)));
}
