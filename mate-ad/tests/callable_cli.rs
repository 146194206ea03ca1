use assert_cmd::Command;
use libmarketmate::{Credential, CredentialStore, Database, ProviderType, SqliteCredentialStore};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
    db_path: PathBuf,
}

fn setup(graph_base: &str) -> TestEnv {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    let db_path = temp_dir.path().join("mm.db");

    std::fs::write(
        &config_path,
        format!(
            r#"
[database]
path = "{}"

[graph]
base_url = "{}"
version = "v21.0"
"#,
            db_path.display(),
            graph_base
        ),
    )
    .unwrap();

    TestEnv {
        _temp_dir: temp_dir,
        config_path,
        db_path,
    }
}

async fn store_credentials(db_path: &Path, credentials: &[(ProviderType, Credential)]) {
    let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
    let store = SqliteCredentialStore::new(db);
    for (provider, credential) in credentials {
        store.put("alice", *provider, credential).await.unwrap();
    }
}

fn mate_ad(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("mate-ad").unwrap();
    cmd.env("MARKETMATE_CONFIG", &env.config_path)
        .env("MARKETMATE_DB_PATH", &env.db_path)
        .env_remove("MARKETMATE_CALLER")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_missing_caller_is_unauthenticated() {
    let env = setup("http://127.0.0.1:9");
    let output = mate_ad(&env).output().unwrap();

    assert_eq!(output.status.code(), Some(16));
    let body = stdout_json(&output);
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["message"], "User must be authenticated to create ads");
}

#[test]
fn test_missing_post_id_is_invalid_argument() {
    let env = setup("http://127.0.0.1:9");
    mate_ad(&env)
        .args(["--caller", "alice"])
        .write_stdin("{}")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("invalid-argument"))
        .stdout(predicate::str::contains("post_id is required"));
}

#[test]
fn test_malformed_json_is_invalid_argument() {
    let env = setup("http://127.0.0.1:9");
    mate_ad(&env)
        .args(["--caller", "alice"])
        .write_stdin("{not json")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Invalid request JSON"));
}

#[test]
fn test_missing_credentials_is_failed_precondition() {
    let env = setup("http://127.0.0.1:9");
    let output = mate_ad(&env)
        .env("MARKETMATE_CALLER", "alice")
        .write_stdin(r#"{"post_id":"456"}"#)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(9));
    let body = stdout_json(&output);
    assert_eq!(body["code"], "failed-precondition");
    assert_eq!(
        body["message"],
        "Facebook Page credentials not found. Please add them in Credential Vault."
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_creates_ad_set_and_ad() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v21.0/act_999/adsets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "adset-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v21.0/act_999/ads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ad-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let env = setup(&server.uri());
    store_credentials(
        &env.db_path,
        &[
            (ProviderType::Facebook, Credential::facebook("page-token", "123")),
            (
                ProviderType::FacebookAds,
                Credential::facebook_ads("ads-token", "999", "camp-1"),
            ),
        ],
    )
    .await;

    let mut cmd = mate_ad(&env);
    cmd.args(["--caller", "alice"])
        .write_stdin(r#"{"post_id":"456","daily_budget_cents":5000}"#);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let body = stdout_json(&output);
    assert_eq!(body["success"], true);
    assert_eq!(body["campaign_id"], "camp-1");
    assert_eq!(body["adset_id"], "adset-1");
    assert_eq!(body["ad_id"], "ad-1");
    assert!(body.get("instagram_post_id").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_provider_rejection_is_an_unsuccessful_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v21.0/act_999/adsets"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid parameter", "type": "OAuthException", "code": 100}
        })))
        .mount(&server)
        .await;

    let env = setup(&server.uri());
    store_credentials(
        &env.db_path,
        &[
            (ProviderType::Facebook, Credential::facebook("page-token", "123")),
            (
                ProviderType::FacebookAds,
                Credential::facebook_ads("ads-token", "999", "camp-1"),
            ),
        ],
    )
    .await;

    let mut cmd = mate_ad(&env);
    cmd.args(["--caller", "alice"])
        .write_stdin(r#"{"post_id":"456"}"#);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let body = stdout_json(&output);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to create ad set: Invalid parameter");
}
