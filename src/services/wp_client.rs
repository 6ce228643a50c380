//! Minimal WordPress REST API client.
//!
//! Authenticates with HTTP Basic auth using a WordPress application
//! password. Every call carries the configured timeout.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::models::site::Site;

#[derive(Debug, thiserror::Error)]
pub enum WpError {
    #[error("WP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("WP non-JSON response (HTTP {status}): {snippet}")]
    NonJson { status: u16, snippet: String },

    #[error("WP error: {0}")]
    Api(String),
}

pub struct WpClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    app_password: String,
}

impl WpClient {
    pub fn new(site: &Site, timeout: Duration) -> Result<Self, WpError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: site.base_url.trim_end_matches('/').to_string(),
            username: site.wp_username.clone(),
            app_password: site.wp_app_password.clone(),
        })
    }

    pub async fn get(&self, path: &str) -> Result<Value, WpError> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post(&self, path: &str, payload: &Value) -> Result<Value, WpError> {
        self.send(self.http.post(self.url(path)).json(payload)).await
    }

    /// Update via POST with `X-HTTP-Method-Override: PUT`, which works on
    /// hosts that block PUT.
    pub async fn put(&self, path: &str, payload: &Value) -> Result<Value, WpError> {
        self.send(
            self.http
                .post(self.url(path))
                .header("X-HTTP-Method-Override", "PUT")
                .json(payload),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// - `Request`: transport failure or timeout
    /// - `NonJson`: body is not a JSON object or array
    /// - `Api`: HTTP status >= 400, with WordPress's `message` when present
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, WpError> {
        let response = request
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.app_password))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let decoded = match serde_json::from_str::<Value>(&body) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => value,
            _ => {
                return Err(WpError::NonJson {
                    status: status.as_u16(),
                    snippet: body.chars().take(300).collect(),
                });
            }
        };

        if status.is_client_error() || status.is_server_error() {
            return Err(WpError::Api(api_message(status, &decoded)));
        }

        Ok(decoded)
    }
}

fn api_message(status: StatusCode, body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WpClient {
        let site = Site {
            site_id: "main".to_string(),
            base_url: format!("{}/", server.uri()),
            wp_username: "bot".to_string(),
            wp_app_password: "abcd efgh".to_string(),
        };
        WpClient::new(&site, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn get_sends_basic_auth_and_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/pages"))
            .and(query_param("slug", "about"))
            .and(header_exists("Authorization"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 5}])))
            .mount(&server)
            .await;

        let found = client(&server)
            .get("/wp-json/wp/v2/pages?slug=about")
            .await
            .unwrap();
        assert_eq!(found[0]["id"], 5);
    }

    #[tokio::test]
    async fn put_uses_method_override() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wp/v2/pages/5"))
            .and(header("X-HTTP-Method-Override", "PUT"))
            .and(body_json(json!({"title": "New"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
            .mount(&server)
            .await;

        let updated = client(&server)
            .put("/wp-json/wp/v2/pages/5", &json!({"title": "New"}))
            .await
            .unwrap();
        assert_eq!(updated["id"], 5);
    }

    #[tokio::test]
    async fn error_status_surfaces_wordpress_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"code": "rest_cannot_create", "message": "Sorry, you are not allowed"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .post("/wp-json/wp/v2/pages", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "WP error: Sorry, you are not allowed");
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client(&server).get("/wp-json/wp/v2/pages/1").await.unwrap_err();
        assert!(matches!(err, WpError::NonJson { status: 200, .. }));
    }
}
