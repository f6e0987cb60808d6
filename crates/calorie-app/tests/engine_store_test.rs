//! Integration tests for the accounting engine over file-backed stores

use std::sync::Arc;
use std::time::Duration;

use calorie_app::repository::open_engine_at;
use calorie_app::{AccountingEngine, CaptureFlow, DeepLink};
use calorie_domain::repository::{EntryRepository, SharedStateChannel};
use calorie_infra::{FileEntryRepository, FileSharedState};
use calorie_types::{Error, Provider, SettingsUpdate, VisionError};
use calorie_vision::{sample_meal_image, AnalyzerConfig, VisionService};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn engine(dir: &std::path::Path) -> AccountingEngine {
    open_engine_at(dir).unwrap().with_settle_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_entries_and_settings_survive_reopen() {
    let dir = tempdir().unwrap();
    let id = {
        let engine = engine(dir.path());
        engine
            .update_settings(SettingsUpdate::new().with_target(1600))
            .await
            .unwrap();
        let entry = engine
            .add_entry(Some(vec![0xFF, 0xD8, 0xFF, 0xE0]), "Ramen", 550)
            .await
            .unwrap();
        engine.adjust_servings(entry.id, 1).await.unwrap();
        entry.id
    };

    let engine = engine(dir.path());
    let entry = engine.entry(id).await.unwrap().unwrap();
    assert_eq!(entry.servings, 2);
    assert_eq!(entry.image_data.as_deref(), Some(&[0xFF, 0xD8, 0xFF, 0xE0][..]));

    let summary = engine.summary().await.unwrap();
    assert_eq!(summary.target, 1600);
    assert_eq!(summary.consumed, 1100);
    assert_eq!(summary.remaining, 500);
}

#[tokio::test]
async fn test_snapshot_file_tracks_mutations() {
    let dir = tempdir().unwrap();
    let engine = engine(dir.path());
    let shared = FileSharedState::new(dir.path().join("shared"));
    assert!(shared.read().is_none());

    let entry = engine.add_entry(None, "Burger", 800).await.unwrap();
    let snapshot = shared.read().unwrap();
    assert_eq!(snapshot.consumed_calories, 800);
    assert_eq!(snapshot.remaining_calories, 1200);
    assert_eq!(snapshot.total_calories, 2000);

    engine.delete_entry(entry.id).await.unwrap();
    assert_eq!(shared.read().unwrap().consumed_calories, 0);
    assert!(dir.path().join("shared").join("refresh.stamp").exists());
}

#[tokio::test]
async fn test_delayed_refresh_flushes_before_exit() {
    let dir = tempdir().unwrap();
    let engine = open_engine_at(dir.path())
        .unwrap()
        .with_settle_delay(Duration::from_millis(30));
    let stamp = dir.path().join("shared").join("refresh.stamp");

    engine.add_entry(None, "Yogurt", 150).await.unwrap();
    engine.flush().await;
    assert!(stamp.exists());
}

#[tokio::test]
async fn test_unreadable_settings_keep_add_successful() {
    let dir = tempdir().unwrap();
    let engine = engine(dir.path());
    std::fs::write(dir.path().join("store").join("settings.json"), "{broken").unwrap();

    let entry = engine.add_entry(None, "Pizza", 500).await.unwrap();

    let stored = FileEntryRepository::open(dir.path().join("store"))
        .unwrap()
        .find_since(chrono::DateTime::<chrono::Utc>::MIN_UTC)
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, entry.id);
    assert!(FileSharedState::new(dir.path().join("shared")).read().is_none());
}

/// One-shot HTTP server replying with a canned OpenAI completion
async fn openai_stub(content: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1/chat/completions", listener.local_addr().unwrap());
    let body = serde_json::json!({"choices": [{"message": {"content": content}}]}).to_string();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    url
}

async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                return;
            }
        }
    }
}

#[tokio::test]
async fn test_deep_link_capture_end_to_end() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(engine(dir.path()));
    engine
        .update_settings(
            SettingsUpdate::new()
                .with_provider(Provider::OpenAi)
                .with_api_key("sk-test"),
        )
        .await
        .unwrap();

    let url = openai_stub("{\"description\": \"Pancakes\", \"calories\": 430}").await;
    let analyzer = VisionService::new(AnalyzerConfig::default().with_openai_url(Some(url))).unwrap();
    let flow = CaptureFlow::new(engine.clone(), Arc::new(analyzer));

    let link = DeepLink::parse("countingworms://camera").unwrap();
    let entry = flow
        .dispatch(link, sample_meal_image().unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(entry.description, "Pancakes");
    assert_eq!(entry.calories_per_serving, 430);
    assert!(entry.has_image());
    assert_eq!(engine.consumed_today().await.unwrap(), 430);
}

#[tokio::test]
async fn test_capture_without_key_touches_nothing() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(engine(dir.path()));
    let analyzer = VisionService::new(
        AnalyzerConfig::default().with_openai_url(Some("http://127.0.0.1:9/v1".into())),
    )
    .unwrap();
    let flow = CaptureFlow::new(engine.clone(), Arc::new(analyzer));

    let err = flow
        .capture(sample_meal_image().unwrap(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Vision(VisionError::MissingCredential)));
    assert!(engine.today_entries().await.unwrap().is_empty());
}
