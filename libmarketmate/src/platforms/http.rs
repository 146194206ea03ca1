//! Thin JSON-over-HTTP helper shared by the provider publishers and the ad orchestrator

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

use crate::error::{PlatformError, Result};

/// Status, headers and parsed body of one provider reply
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub headers: HeaderMap,
    /// `Value::Null` when the body is empty or not JSON
    pub body: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Best-effort human message from a provider error envelope
    pub fn error_message(&self, fallback: &str) -> String {
        extract_error_message(&self.body, fallback)
    }

    /// String (or numeric) field of the body
    pub fn str_field(&self, field: &str) -> Option<String> {
        match self.body.get(field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Pull a message out of the error envelopes the providers use:
/// `{"error": {"message": ..}}`, `{"message": ..}`, `{"error_description": ..}`
/// and `{"error": ".."}`
pub fn extract_error_message(body: &Value, fallback: &str) -> String {
    let candidates = [
        body.pointer("/error/message"),
        body.get("message"),
        body.get("error_description"),
        body.get("error"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

#[derive(Clone)]
pub struct ProviderHttp {
    client: Client,
    base_url: String,
}

impl ProviderHttp {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("marketmate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> std::result::Result<HttpReply, PlatformError> {
        self.send(Method::GET, path, query, None, bearer, &[]).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        bearer: Option<&str>,
        headers: &[(&str, &str)],
    ) -> std::result::Result<HttpReply, PlatformError> {
        self.send(Method::POST, path, &[], Some(body), bearer, headers)
            .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
        bearer: Option<&str>,
        headers: &[(&str, &str)],
    ) -> std::result::Result<HttpReply, PlatformError> {
        let mut request = self.client.request(method.clone(), self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        tracing::debug!(method = %method, path, "Provider request");

        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| PlatformError::Network(e.without_url().to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);

        tracing::debug!(path, status, "Provider reply");

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_package_metadata_inherited_from_workspace() {
        assert_eq!(
            env!("CARGO_PKG_REPOSITORY"),
            "https://github.com/marketmate/marketmate"
        );
        assert!(!env!("CARGO_PKG_VERSION").is_empty());
    }

    #[test]
    fn test_graph_error_envelope() {
        let body = json!({"error": {"message": "(#200) Permissions error", "code": 200}});
        assert_eq!(extract_error_message(&body, "x"), "(#200) Permissions error");
    }

    #[test]
    fn test_linkedin_error_shapes() {
        assert_eq!(
            extract_error_message(&json!({"message": "Not enough permissions"}), "x"),
            "Not enough permissions"
        );
        assert_eq!(
            extract_error_message(&json!({"error": "invalid_token", "error_description": "expired"}), "x"),
            "expired"
        );
        assert_eq!(
            extract_error_message(&json!({"error": "invalid_request"}), "x"),
            "invalid_request"
        );
    }

    #[test]
    fn test_fallback_message() {
        assert_eq!(extract_error_message(&Value::Null, "Failed"), "Failed");
        assert_eq!(extract_error_message(&json!({"message": "  "}), "Failed"), "Failed");
        assert_eq!(extract_error_message(&json!({"error": {"code": 1}}), "Failed"), "Failed");
    }

    #[test]
    fn test_url_joining() {
        let http = ProviderHttp::new("https://graph.example.com/v21.0/", 5).unwrap();
        assert_eq!(http.url("/me/accounts"), "https://graph.example.com/v21.0/me/accounts");
        assert_eq!(http.url("123/photos"), "https://graph.example.com/v21.0/123/photos");
    }
}
