//! Tests for the media fetcher against a mock search API.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tagrelay_fetch::{FetchConfig, HashtagClient, MediaFetcher, MediaKind, SearchCredentials};
use tagrelay_ledger::Ledger;
use tagrelay_retry::RetryPolicy;
use tempfile::TempDir;

fn fetcher(server: &ServerGuard, dir: &Path) -> anyhow::Result<MediaFetcher> {
    let config = FetchConfig::default()
        .with_search_base_url(server.url())
        .with_media_dirs(dir.join("images"), dir.join("videos"))
        .with_courtesy_delay(0, 0)
        .with_search_retry(RetryPolicy::no_retry());
    let client = HashtagClient::new(&config, SearchCredentials::new("test-key", "test-host"))?;
    let ledger = Arc::new(Ledger::load(dir.join("download_history.csv"))?);
    Ok(MediaFetcher::new(client, ledger, config)?)
}

fn image_item(server: &ServerGuard, id: u64) -> Value {
    json!({
        "pk": id,
        "is_video": false,
        "image_versions": {"items": [{"url": format!("{}/media/{}.jpg", server.url(), id)}]}
    })
}

fn video_item(server: &ServerGuard, id: u64) -> Value {
    json!({
        "pk": id,
        "is_video": true,
        "video_url": format!("{}/media/{}.mp4", server.url(), id)
    })
}

fn page(items: Vec<Value>, token: Option<&str>) -> String {
    json!({"data": {"items": items}, "pagination_token": token}).to_string()
}

async fn mock_search(server: &mut ServerGuard, query: &str, body: String) -> mockito::Mock {
    server
        .mock("GET", "/v1/hashtag")
        .match_query(Matcher::Exact(query.to_string()))
        .match_header("x-rapidapi-key", "test-key")
        .match_header("x-rapidapi-host", "test-host")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

async fn mock_media(server: &mut ServerGuard, path: &str, body: &str) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_max_items_caps_downloads() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let items = (1..=10).map(|id| image_item(&server, id)).collect();
    mock_search(&mut server, "hashtag=nature", page(items, None)).await;
    let mut media = Vec::new();
    for id in 1..=10 {
        media.push(mock_media(&mut server, &format!("/media/{}.jpg", id), "jpeg bytes").await);
    }

    let fetcher = fetcher(&server, temp_dir.path())?;
    let report = fetcher.fetch_for_tag("nature", 3, MediaKind::Image).await?;

    assert_eq!(report.downloaded_count(), 3);
    assert_eq!(fetcher.ledger().len(), 3);
    assert_eq!(files_in(&temp_dir.path().join("images")), 3);
    for path in report.downloaded() {
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path)?, "jpeg bytes");
    }
    Ok(())
}

#[tokio::test]
async fn test_sunrise_skips_already_downloaded_item() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let items = (1..=4).map(|id| image_item(&server, id)).collect();
    mock_search(&mut server, "hashtag=sunrise", page(items, None)).await;
    mock_media(&mut server, "/media/1.jpg", "one").await;
    let already = server
        .mock("GET", "/media/2.jpg")
        .with_status(200)
        .expect(0)
        .create_async()
        .await;
    mock_media(&mut server, "/media/3.jpg", "three").await;
    mock_media(&mut server, "/media/4.jpg", "four").await;

    let fetcher = fetcher(&server, temp_dir.path())?;
    fetcher
        .ledger()
        .record("sunrise", 2_u64, "https://cdn.example/2.jpg", "images/sunrise_2_image.jpg")?;

    let report = fetcher.fetch_for_tag("sunrise", 2, MediaKind::Image).await?;

    assert_eq!(report.downloaded_count(), 2);
    assert!(
        report
            .downloaded()
            .iter()
            .all(|p| !p.to_string_lossy().contains("sunrise_2_image"))
    );
    assert_eq!(fetcher.ledger().len(), 3);
    assert_eq!(files_in(&temp_dir.path().join("images")), 2);
    already.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_second_run_downloads_nothing() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let items = vec![video_item(&server, 11), video_item(&server, 12)];
    let search = server
        .mock("GET", "/v1/hashtag")
        .match_query(Matcher::Exact("hashtag=waves".to_string()))
        .with_status(200)
        .with_body(page(items, None))
        .expect(2)
        .create_async()
        .await;
    let first = server
        .mock("GET", "/media/11.mp4")
        .with_body("v11")
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/media/12.mp4")
        .with_body("v12")
        .expect(1)
        .create_async()
        .await;

    let fetcher = fetcher(&server, temp_dir.path())?;
    let run_one = fetcher.fetch_for_tag("waves", 5, MediaKind::Video).await?;
    let run_two = fetcher.fetch_for_tag("waves", 5, MediaKind::Video).await?;

    assert_eq!(run_one.downloaded_count(), 2);
    assert_eq!(run_two.downloaded_count(), 0);
    assert_eq!(run_two.already_downloaded().len(), 2);
    assert_eq!(fetcher.ledger().len(), 2);
    search.assert_async().await;
    first.assert_async().await;
    second.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_failed_search_only_aborts_its_tag() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let tags: Vec<String> = (1..=5).map(|n| format!("tag{}", n)).collect();
    for (n, tag) in tags.iter().enumerate() {
        let query = format!("hashtag={}", tag);
        if tag == "tag3" {
            server
                .mock("GET", "/v1/hashtag")
                .match_query(Matcher::Exact(query))
                .with_status(500)
                .with_body("upstream exploded")
                .create_async()
                .await;
            continue;
        }
        let id = 100 + n as u64;
        let body = page(vec![image_item(&server, id)], None);
        mock_search(&mut server, &query, body).await;
        mock_media(&mut server, &format!("/media/{}.jpg", id), "img").await;
    }

    let fetcher = fetcher(&server, temp_dir.path())?;
    let report = fetcher.fetch_tags(&tags, 1, MediaKind::Image).await;

    assert_eq!(report.succeeded_tag_count(), 4);
    assert_eq!(report.downloaded_count(), 4);
    assert_eq!(report.failed_tags().len(), 1);
    assert_eq!(report.failed_tags()[0].0, "tag3");
    assert!(report.failed_tags()[0].1.contains("500"));
    assert_eq!(report.paths().len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_pagination_follows_continuation_token() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let first = vec![image_item(&server, 1), image_item(&server, 2)];
    let second = vec![image_item(&server, 3), image_item(&server, 4)];
    mock_search(&mut server, "hashtag=city", page(first, Some("page-2"))).await;
    mock_search(
        &mut server,
        "hashtag=city&continuation_token=page-2",
        page(second, None),
    )
    .await;
    for id in 1..=4 {
        mock_media(&mut server, &format!("/media/{}.jpg", id), "img").await;
    }

    let fetcher = fetcher(&server, temp_dir.path())?;
    let report = fetcher.fetch_for_tag("city", 3, MediaKind::Image).await?;

    assert_eq!(report.downloaded_count(), 3);
    assert_eq!(*report.pages(), 2);
    Ok(())
}

#[tokio::test]
async fn test_failed_item_download_is_skipped() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let items = vec![image_item(&server, 31), image_item(&server, 32)];
    mock_search(&mut server, "hashtag=forest", page(items, None)).await;
    mock_media(&mut server, "/media/31.jpg", "ok").await;
    server
        .mock("GET", "/media/32.jpg")
        .with_status(404)
        .create_async()
        .await;

    let fetcher = fetcher(&server, temp_dir.path())?;
    let report = fetcher.fetch_for_tag("forest", 2, MediaKind::Image).await?;

    assert_eq!(report.downloaded_count(), 1);
    assert_eq!(*report.failed(), 1);
    assert!(fetcher.ledger().contains(31_u64));
    assert!(!fetcher.ledger().contains(32_u64));
    assert_eq!(files_in(&temp_dir.path().join("images")), 1);
    Ok(())
}

#[tokio::test]
async fn test_kind_filter_excludes_other_media() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let items = vec![
        image_item(&server, 41),
        video_item(&server, 42),
        image_item(&server, 43),
    ];
    mock_search(&mut server, "hashtag=mixed", page(items, None)).await;
    let video = mock_media(&mut server, "/media/42.mp4", "video").await;
    let image = server
        .mock("GET", Matcher::Regex(r"^/media/\d+\.jpg$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let fetcher = fetcher(&server, temp_dir.path())?;
    let report = fetcher.fetch_for_tag("mixed", 5, MediaKind::Video).await?;

    assert_eq!(report.downloaded_count(), 1);
    assert_eq!(*report.skipped(), 2);
    assert!(report.downloaded()[0].ends_with("mixed_42_video.mp4"));
    video.assert_async().await;
    image.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_cancelled_run_starts_no_tags() -> anyhow::Result<()> {
    let server = Server::new_async().await;
    let temp_dir = TempDir::new()?;
    let (tx, rx) = tokio::sync::watch::channel(false);
    tx.send(true)?;

    let fetcher = fetcher(&server, temp_dir.path())?.with_cancellation(rx);
    let tags = vec!["one".to_string(), "two".to_string()];
    let report = fetcher.fetch_tags(&tags, 3, MediaKind::Image).await;

    assert_eq!(report.succeeded_tag_count(), 0);
    assert_eq!(report.cancelled_tags(), &tags);
    Ok(())
}

#[tokio::test]
async fn test_ids_that_need_rewriting_are_skipped() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let temp_dir = TempDir::new()?;

    let items = vec![
        json!({
            "pk": "12/34",
            "is_video": false,
            "image_versions": {"items": [{"url": format!("{}/media/slash.jpg", server.url())}]}
        }),
        json!({
            "pk": "12_34",
            "is_video": false,
            "image_versions": {"items": [{"url": format!("{}/media/plain.jpg", server.url())}]}
        }),
    ];
    mock_search(&mut server, "hashtag=harbor", page(items, None)).await;
    let slash = server
        .mock("GET", "/media/slash.jpg")
        .expect(0)
        .create_async()
        .await;
    mock_media(&mut server, "/media/plain.jpg", "plain").await;

    let fetcher = fetcher(&server, temp_dir.path())?;
    let report = fetcher.fetch_for_tag("harbor", 5, MediaKind::Image).await?;

    assert_eq!(report.downloaded_count(), 1);
    assert_eq!(*report.skipped(), 1);
    assert!(fetcher.ledger().contains("12_34"));
    assert!(!fetcher.ledger().contains("12/34"));
    let written = std::fs::read_to_string(temp_dir.path().join("images/harbor_12_34_image.jpg"))?;
    assert_eq!(written, "plain");
    slash.assert_async().await;
    Ok(())
}
