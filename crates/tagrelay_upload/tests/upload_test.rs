//! Tests for the upload client against a mock destination service.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tagrelay_upload::{
    ProgressSink, TransferMode, UploadClient, UploadConfig, UploadCredentials, UploadErrorKind,
    UploadPhase, UploadProgress, UploadSummary,
};
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<u64>>,
    phases: Mutex<Vec<UploadPhase>>,
}

impl ProgressSink for Recorder {
    fn on_progress(&self, _path: &Path, progress: UploadProgress) {
        self.progress.lock().unwrap().push(progress.bytes_sent);
    }

    fn on_phase(&self, _path: &Path, phase: UploadPhase) {
        self.phases.lock().unwrap().push(phase);
    }
}

/// Captures formatted log lines for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn client(server: &ServerGuard, mode: TransferMode) -> anyhow::Result<UploadClient> {
    let config = UploadConfig::default()
        .with_base_url(server.url())
        .with_chunk_size(5)
        .with_transfer_mode(mode)
        .with_backoff(0, 0);
    Ok(UploadClient::new(config, UploadCredentials::new("test-token"))?)
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> anyhow::Result<PathBuf> {
    let path = dir.path().join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

async fn mock_ticket(server: &mut ServerGuard) -> mockito::Mock {
    let body = json!({
        "status": "success",
        "url": format!("{}/signed/abc", server.url()),
        "hash": "h1"
    })
    .to_string();
    server
        .mock("POST", "/posts/generate-upload-url")
        .match_header("Flic-Token", "test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_streamed_upload_happy_path() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let path = write_file(&temp_dir, "clip.mp4", "aaaaabbbbbcc")?;

    let ticket = server
        .mock("POST", "/posts/generate-upload-url")
        .match_header("Flic-Token", "test-token")
        .match_body(Matcher::Json(json!({"file_size": 12})))
        .with_status(200)
        .with_body(
            json!({
                "status": "success",
                "url": format!("{}/signed/abc", server.url()),
                "hash": "h1"
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/signed/abc")
        .match_header("content-length", "12")
        .match_body("aaaaabbbbbcc")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/posts")
        .match_header("Flic-Token", "test-token")
        .match_body(Matcher::Json(json!({
            "title": "clip_upload",
            "hash": "h1",
            "is_available_in_public_feed": false,
            "category_id": 25
        })))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let client = client(&server, TransferMode::Streamed)?.with_progress(recorder.clone());
    let session = client.upload_single(&path, 25, 3).await?;

    assert_eq!(*session.phase(), UploadPhase::Done);
    assert_eq!(*session.attempt(), 1);
    assert_eq!(session.content_hash(), Some("h1"));
    let progress = recorder.progress.lock().unwrap().clone();
    assert_eq!(progress.last(), Some(&12));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(progress.iter().all(|sent| [5, 10, 12].contains(sent)));
    ticket.assert_async().await;
    put.assert_async().await;
    post.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_chunked_upload_sends_ranges_in_order() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let path = write_file(&temp_dir, "clip.mp4", "aaaaabbbbbcc")?;

    mock_ticket(&mut server).await;
    let mut chunks = Vec::new();
    for (range, body) in [
        ("bytes 0-4/12", "aaaaa"),
        ("bytes 5-9/12", "bbbbb"),
        ("bytes 10-11/12", "cc"),
    ] {
        chunks.push(
            server
                .mock("PUT", "/signed/abc")
                .match_header("content-range", range)
                .match_body(body)
                .with_status(204)
                .expect(1)
                .create_async()
                .await,
        );
    }
    server
        .mock("POST", "/posts")
        .with_status(200)
        .create_async()
        .await;

    let recorder = Arc::new(Recorder::default());
    let client = client(&server, TransferMode::Chunked)?.with_progress(recorder.clone());
    client.upload_single(&path, 25, 1).await?;

    assert_eq!(*recorder.progress.lock().unwrap(), vec![5, 10, 12]);
    assert_eq!(
        *recorder.phases.lock().unwrap(),
        vec![
            UploadPhase::RequestingUrl,
            UploadPhase::Uploading,
            UploadPhase::CreatingPost,
            UploadPhase::Done
        ]
    );
    for chunk in chunks {
        chunk.assert_async().await;
    }
    Ok(())
}

#[tokio::test]
async fn test_failed_chunk_aborts_before_post_creation() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let path = write_file(&temp_dir, "clip.mp4", "aaaaabbbbbcc")?;

    mock_ticket(&mut server).await;
    let first = server
        .mock("PUT", "/signed/abc")
        .match_body("aaaaa")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("PUT", "/signed/abc")
        .match_body("bbbbb")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let third = server
        .mock("PUT", "/signed/abc")
        .match_body("cc")
        .expect(0)
        .create_async()
        .await;
    let post = server
        .mock("POST", "/posts")
        .expect(0)
        .create_async()
        .await;

    let client = client(&server, TransferMode::Chunked)?;
    let err = client.upload_single(&path, 25, 1).await.unwrap_err();

    assert!(matches!(err.kind, UploadErrorKind::Transfer(_)));
    first.assert_async().await;
    second.assert_async().await;
    third.assert_async().await;
    post.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_retry_exhaustion_makes_exactly_max_attempts() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let path = write_file(&temp_dir, "clip.mp4", "aaaaabbbbbcc")?;

    let ticket = server
        .mock("POST", "/posts/generate-upload-url")
        .with_status(500)
        .with_body("unavailable")
        .expect(3)
        .create_async()
        .await;
    let put = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _log_guard = tracing::subscriber::set_default(subscriber);

    let client = client(&server, TransferMode::Streamed)?;
    let err = client.upload_single(&path, 25, 3).await.unwrap_err();

    assert!(matches!(err.kind, UploadErrorKind::UploadUrl(_)));
    ticket.assert_async().await;
    put.assert_async().await;

    let lines = logs.lines();
    let failures: Vec<_> = lines
        .iter()
        .filter(|l| l.contains("Attempt failed"))
        .collect();
    assert_eq!(failures.len(), 3);
    for (n, line) in failures.iter().enumerate() {
        assert!(line.contains(&format!(" attempt={} ", n + 1)), "{}", line);
    }
    assert_eq!(lines.iter().filter(|l| l.contains("Retries exhausted")).count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_field_is_an_upload_url_error() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let path = write_file(&temp_dir, "clip.mp4", "abc")?;

    let ticket = server
        .mock("POST", "/posts/generate-upload-url")
        .with_status(200)
        .with_body(r#"{"status": "error", "message": "quota exceeded"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = client(&server, TransferMode::Streamed)?;
    let err = client.upload_single(&path, 25, 2).await.unwrap_err();

    assert!(matches!(err.kind, UploadErrorKind::UploadUrl(_)));
    ticket.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_file_fails_without_requests() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let ticket = server
        .mock("POST", "/posts/generate-upload-url")
        .expect(0)
        .create_async()
        .await;

    let client = client(&server, TransferMode::Streamed)?;
    let err = client
        .upload_single(&temp_dir.path().join("missing.mp4"), 25, 3)
        .await
        .unwrap_err();

    assert!(matches!(err.kind, UploadErrorKind::FileNotFound(_)));
    ticket.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_batch_results_follow_submission_order() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let first = write_file(&temp_dir, "first.mp4", "one")?;
    let missing = temp_dir.path().join("missing.mp4");
    let third = write_file(&temp_dir, "third.mp4", "three")?;

    mock_ticket(&mut server).await;
    server
        .mock("PUT", "/signed/abc")
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("POST", "/posts")
        .with_status(201)
        .create_async()
        .await;

    let client = client(&server, TransferMode::Streamed)?;
    let files = vec![first.clone(), missing.clone(), third.clone()];
    let outcomes = client.upload_batch(&files, 25, 2).await;

    let paths: Vec<&Path> = outcomes.iter().map(|o| o.path()).collect();
    assert_eq!(paths, vec![first.as_path(), missing.as_path(), third.as_path()]);
    assert!(outcomes[0].succeeded());
    assert!(matches!(
        outcomes[1].error().map(|e| &e.kind),
        Some(UploadErrorKind::FileNotFound(_))
    ));
    assert!(outcomes[2].succeeded());

    let summary = UploadSummary::from(outcomes.as_slice());
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    Ok(())
}
