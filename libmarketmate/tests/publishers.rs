//! Provider publishers against mock Graph and LinkedIn servers

use libmarketmate::config::{GraphConfig, LinkedInConfig};
use libmarketmate::credentials::AccessToken;
use libmarketmate::platforms::{
    FacebookPublisher, InstagramPublisher, LinkedInPublisher, PublishContent, Publisher,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn graph(server: &MockServer) -> GraphConfig {
    GraphConfig {
        base_url: server.uri(),
        version: "v21.0".to_string(),
        timeout_secs: 5,
    }
}

fn linkedin(server: &MockServer) -> LinkedInConfig {
    LinkedInConfig {
        base_url: server.uri(),
        timeout_secs: 5,
    }
}

fn granted(permissions: &[&str]) -> serde_json::Value {
    let data: Vec<_> = permissions
        .iter()
        .map(|p| json!({ "permission": p, "status": "granted" }))
        .collect();
    json!({ "data": data })
}

async fn mount_page_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v21.0/me/accounts"))
        .and(query_param("access_token", "user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "123",
                "name": "Green Crumb Bakery",
                "access_token": "page-token",
                "category": "Bakery"
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_facebook_publish_with_image_returns_post_id() {
    let server = MockServer::start().await;
    mount_page_listing(&server).await;
    Mock::given(method("POST"))
        .and(path("/v21.0/123/photos"))
        .and(body_partial_json(json!({
            "url": "https://images.example/bread.jpg",
            "caption": "Fresh bread today",
            "access_token": "page-token"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "123_456" })))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = FacebookPublisher::from_config(&graph(&server)).unwrap();
    let content = PublishContent::new(
        "Fresh bread today",
        Some("https://images.example/bread.jpg".to_string()),
    );
    let result = publisher
        .publish(&content, &AccessToken::new("user-token"), "123")
        .await;

    assert!(result.success);
    assert_eq!(result.post_id.as_deref(), Some("123_456"));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_facebook_text_only_posts_to_feed() {
    let server = MockServer::start().await;
    mount_page_listing(&server).await;
    Mock::given(method("POST"))
        .and(path("/v21.0/123/feed"))
        .and(body_partial_json(json!({ "message": "Open late tonight" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "123_789" })))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = FacebookPublisher::from_config(&graph(&server)).unwrap();
    let result = publisher
        .publish(
            &PublishContent::text("Open late tonight"),
            &AccessToken::new("user-token"),
            "123",
        )
        .await;

    assert_eq!(result.post_id.as_deref(), Some("123_789"));
}

#[tokio::test]
async fn test_facebook_error_envelope_becomes_failed_result() {
    let server = MockServer::start().await;
    mount_page_listing(&server).await;
    Mock::given(method("POST"))
        .and(path("/v21.0/123/photos"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "(#200) The permission(s) pages_manage_posts are not available.",
                "type": "OAuthException",
                "code": 200
            }
        })))
        .mount(&server)
        .await;

    let publisher = FacebookPublisher::from_config(&graph(&server)).unwrap();
    let content = PublishContent::new("x", Some("https://images.example/a.jpg".to_string()));
    let result = publisher
        .publish(&content, &AccessToken::new("user-token"), "123")
        .await;

    assert!(!result.success);
    assert!(result.post_id.is_none());
    assert_eq!(
        result.error.as_deref(),
        Some("(#200) The permission(s) pages_manage_posts are not available.")
    );
}

#[tokio::test]
async fn test_facebook_unknown_page_lists_available_pages() {
    let server = MockServer::start().await;
    mount_page_listing(&server).await;

    let publisher = FacebookPublisher::from_config(&graph(&server)).unwrap();
    let result = publisher
        .publish(
            &PublishContent::text("x"),
            &AccessToken::new("user-token"),
            "999",
        )
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.contains("Page ID 999 not found"));
    assert!(error.contains("Green Crumb Bakery (123)"));
}

#[tokio::test]
async fn test_facebook_validation_reports_missing_permissions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v21.0/me/permissions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(granted(&["pages_show_list"])),
        )
        .mount(&server)
        .await;

    let publisher = FacebookPublisher::from_config(&graph(&server)).unwrap();
    let check = publisher
        .validate_credentials(&AccessToken::new("user-token"), "123")
        .await;

    assert!(!check.ok);
    assert_eq!(
        check.missing_permissions,
        vec!["pages_manage_posts", "pages_read_engagement"]
    );
}

#[tokio::test]
async fn test_facebook_validation_passes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v21.0/me/permissions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(granted(&[
            "pages_manage_posts",
            "pages_read_engagement",
            "pages_show_list",
        ])))
        .mount(&server)
        .await;
    mount_page_listing(&server).await;

    let publisher = FacebookPublisher::from_config(&graph(&server)).unwrap();
    let check = publisher
        .validate_credentials(&AccessToken::new("user-token"), "123")
        .await;

    assert!(check.ok);
    assert_eq!(check.account.as_deref(), Some("Green Crumb Bakery (123)"));
}

#[tokio::test]
async fn test_instagram_publishes_in_two_phases() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v21.0/1784/media"))
        .and(body_partial_json(json!({
            "image_url": "https://images.example/cake.jpg",
            "caption": "Cake of the day"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "creation-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v21.0/1784/media_publish"))
        .and(body_partial_json(json!({ "creation_id": "creation-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "ig-post-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let publisher = InstagramPublisher::from_config(&graph(&server)).unwrap();
    let content = PublishContent::new(
        "Cake of the day",
        Some("https://images.example/cake.jpg".to_string()),
    );
    let result = publisher
        .publish(&content, &AccessToken::new("ig-token"), "1784")
        .await;

    assert!(result.success);
    assert_eq!(result.post_id.as_deref(), Some("ig-post-1"));
}

#[tokio::test]
async fn test_instagram_container_failure_skips_publish() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v21.0/1784/media"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid image URL" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v21.0/1784/media_publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "never" })))
        .expect(0)
        .mount(&server)
        .await;

    let publisher = InstagramPublisher::from_config(&graph(&server)).unwrap();
    let content = PublishContent::new("x", Some("https://images.example/bad".to_string()));
    let result = publisher
        .publish(&content, &AccessToken::new("ig-token"), "1784")
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Invalid image URL"));
}

#[tokio::test]
async fn test_instagram_requires_an_image() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let publisher = InstagramPublisher::from_config(&graph(&server)).unwrap();
    let result = publisher
        .publish(&PublishContent::text("x"), &AccessToken::new("ig-token"), "1784")
        .await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Instagram posts require an image"));
}

#[tokio::test]
async fn test_linkedin_share_uses_restli_id_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .and(header("authorization", "Bearer li-token"))
        .and(header("x-restli-protocol-version", "2.0.0"))
        .and(body_partial_json(json!({
            "author": "urn:li:person:abc123",
            "lifecycleState": "PUBLISHED"
        })))
        .respond_with(
            ResponseTemplate::new(201).insert_header("x-restli-id", "urn:li:share:42"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let publisher = LinkedInPublisher::from_config(&linkedin(&server)).unwrap();
    let result = publisher
        .publish(
            &PublishContent::text("We are hiring bakers"),
            &AccessToken::new("li-token"),
            "abc123",
        )
        .await;

    assert!(result.success);
    assert_eq!(result.post_id.as_deref(), Some("urn:li:share:42"));
}

#[tokio::test]
async fn test_linkedin_rejection_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/ugcPosts"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "Not enough permissions to access: ugcPosts.CREATE",
            "status": 403
        })))
        .mount(&server)
        .await;

    let publisher = LinkedInPublisher::from_config(&linkedin(&server)).unwrap();
    let result = publisher
        .publish(
            &PublishContent::text("x"),
            &AccessToken::new("li-token"),
            "abc123",
        )
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Not enough permissions to access: ugcPosts.CREATE")
    );
}

#[tokio::test]
async fn test_linkedin_validation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v2/people/"))
        .and(header("authorization", "Bearer li-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc123" })))
        .mount(&server)
        .await;

    let publisher = LinkedInPublisher::from_config(&linkedin(&server)).unwrap();
    let check = publisher
        .validate_credentials(&AccessToken::new("li-token"), "abc123")
        .await;

    assert!(check.ok);
    assert_eq!(check.account.as_deref(), Some("abc123"));
}
