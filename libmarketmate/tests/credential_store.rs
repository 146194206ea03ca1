//! SQLite credential store on a real database file

use libmarketmate::{Credential, CredentialStore, Database, ProviderType, SqliteCredentialStore};
use tempfile::TempDir;

async fn open(dir: &TempDir) -> SqliteCredentialStore {
    let path = dir.path().join("marketmate.db");
    let db = Database::new(path.to_str().unwrap()).await.unwrap();
    SqliteCredentialStore::new(db)
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open(&dir).await;
        store
            .put("alice", ProviderType::LinkedIn, &Credential::linkedin("li-token", "abc123"))
            .await
            .unwrap();
    }

    let store = open(&dir).await;
    let credential = store
        .get("alice", ProviderType::LinkedIn)
        .await
        .unwrap()
        .expect("record persisted");
    assert_eq!(credential.access_token().expose(), "li-token");
    assert_eq!(credential.target_id(), "abc123");
}

#[tokio::test]
async fn test_put_overwrites_instead_of_duplicating() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let first = Credential::facebook("token-1", "123");
    let second = Credential::facebook("token-2", "123");
    store.put("alice", ProviderType::Facebook, &first).await.unwrap();
    store.put("alice", ProviderType::Facebook, &first).await.unwrap();
    store.put("alice", ProviderType::Facebook, &second).await.unwrap();

    let all = store.get_all("alice").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].access_token().expose(), "token-2");
}

#[tokio::test]
async fn test_records_are_scoped_per_user() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    store
        .put("alice", ProviderType::Instagram, &Credential::instagram("ig", "1784"))
        .await
        .unwrap();

    assert!(store.get("bob", ProviderType::Instagram).await.unwrap().is_none());
    let err = store.require("bob", ProviderType::Instagram).await.unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(
        err.to_string(),
        "Credential error: No instagram credentials found for user bob. Please add them in the credential vault."
    );
}

#[tokio::test]
async fn test_get_all_follows_provider_order() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    store
        .put("alice", ProviderType::LinkedIn, &Credential::linkedin("li", "abc"))
        .await
        .unwrap();
    store
        .put("alice", ProviderType::Facebook, &Credential::facebook("fb", "123"))
        .await
        .unwrap();
    store
        .put(
            "alice",
            ProviderType::FacebookAds,
            &Credential::facebook_ads("ads", "act_1", "camp-1"),
        )
        .await
        .unwrap();

    let providers: Vec<ProviderType> = store
        .get_all("alice")
        .await
        .unwrap()
        .iter()
        .map(Credential::provider_type)
        .collect();
    assert_eq!(
        providers,
        vec![ProviderType::Facebook, ProviderType::FacebookAds, ProviderType::LinkedIn]
    );
}

#[tokio::test]
async fn test_put_rejects_mismatched_provider() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    let err = store
        .put("alice", ProviderType::Instagram, &Credential::facebook("fb", "123"))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(store.get_all("alice").await.unwrap().is_empty());
}
