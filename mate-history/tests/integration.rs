use libmarketmate::types::{ContentCategory, GeneratedContent};
use libmarketmate::{ContentPost, ContentStatus, Database, Platform};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Temp database with three entries for alice and one for bob
async fn seeded_env() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("mm.db");

    std::fs::write(
        &config_path,
        format!("[database]\npath = \"{}\"\n", db_path.display()),
    )
    .unwrap();

    let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
    let entries = [
        ("alice", Platform::Facebook, "Fresh bread, every morning", 100, Some("123_456"), None),
        ("alice", Platform::LinkedIn, "We are hiring, say \"hi\"", 200, None, Some("Invalid access token")),
        ("alice", Platform::Instagram, "Latte art", 300, None, None),
        ("bob", Platform::Facebook, "Bob's post", 400, Some("9_9"), None),
    ];
    for (user, platform, caption, created_at, post_id, error) in entries {
        let content = GeneratedContent {
            caption: caption.to_string(),
            image_url: "https://images.example/a.jpg".to_string(),
            ..Default::default()
        };
        let mut post = ContentPost::new(user, platform, "prompt", ContentCategory::FoodCooking, &content);
        post.created_at = created_at;
        db.save_content_post(&post).await.unwrap();
        match (post_id, error) {
            (Some(id), _) => db
                .update_content_status(&post.id, ContentStatus::Published, Some(id), None)
                .await
                .unwrap(),
            (_, Some(error)) => db
                .update_content_status(&post.id, ContentStatus::Failed, None, Some(error))
                .await
                .unwrap(),
            _ => {}
        }
    }

    (temp_dir, config_path)
}

fn mate_history(config_path: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_mate-history"))
        .env("MARKETMATE_CONFIG", config_path)
        .env_remove("MARKETMATE_DB_PATH")
        .env_remove("MARKETMATE_USER")
        .args(args)
        .output()
        .unwrap()
}

#[tokio::test]
async fn test_text_output_newest_first() {
    let (_temp_dir, config_path) = seeded_env().await;
    let output = mate_history(&config_path, &["--user", "alice"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let latte = stdout.find("Latte art").unwrap();
    let bread = stdout.find("Fresh bread").unwrap();
    assert!(latte < bread);
    assert!(stdout.contains("✓ facebook: 123_456"));
    assert!(stdout.contains("✗ linkedin: Invalid access token"));
    assert!(!stdout.contains("Bob's post"));
}

#[tokio::test]
async fn test_limit_and_filters() {
    let (_temp_dir, config_path) = seeded_env().await;

    let output = mate_history(&config_path, &["--user", "alice", "--limit", "1", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["content"], "Latte art");

    let output = mate_history(
        &config_path,
        &["--user", "alice", "--status", "failed", "--format", "json"],
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["platform"], "linkedin");
    assert_eq!(json[0]["error_message"], "Invalid access token");

    let output = mate_history(&config_path, &["--user", "alice", "--platform", "facebook", "--format", "jsonl"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("123_456"));
}

#[tokio::test]
async fn test_csv_output_escapes_fields() {
    let (_temp_dir, config_path) = seeded_env().await;
    let output = mate_history(&config_path, &["--user", "alice", "--format", "csv"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("id,timestamp,platform,category,status,provider_post_id,error,content")
    );
    assert!(stdout.contains("\"Fresh bread, every morning\""));
    assert!(stdout.contains("\"We are hiring, say \"\"hi\"\"\""));
    assert_eq!(stdout.lines().count(), 4);
}

#[tokio::test]
async fn test_unknown_user_is_empty_success() {
    let (_temp_dir, config_path) = seeded_env().await;
    let output = mate_history(&config_path, &["--user", "carol"]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn test_invalid_platform_filter() {
    let (_temp_dir, config_path) = seeded_env().await;
    let output = mate_history(&config_path, &["--user", "alice", "--platform", "myspace"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid platform"));
}
