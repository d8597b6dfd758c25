//! API client for communicating with the console backend's REST API.
//!
//! This module provides the `ApiClient` struct for the calls the console
//! core needs: configuration, tokens, users and the system catalog.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::models::{LoginPayload, ServerConfig, System, TokenPair};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Fields requested when listing systems for the catalog.
const SYSTEM_INCLUDE_FIELDS: &str = "id,name,version,description,instances,commands";

/// Path of the live event socket, relative to the API base.
const EVENT_SOCKET_PATH: &str = "api/v1/socket/events/";

/// API client for the console backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for the backend at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// WebSocket endpoint of the event stream (no token attached).
    pub fn event_socket_endpoint(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/{}", base, EVENT_SOCKET_PATH)
    }

    fn auth_headers(&self, token: Option<&str>) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request with rate-limit retries and return the successful response.
    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .headers(self.auth_headers(token)?);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to send {} request to {}", method, url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T> {
        let response = self.send::<()>(Method::GET, path, token, None).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", path))
    }

    // ===== Configuration =====

    /// Fetch the console configuration (auth flag, application name, namespaces)
    pub async fn get_config(&self) -> Result<ServerConfig> {
        self.get("config", None).await.context("Failed to fetch server config")
    }

    // ===== Tokens and users =====

    /// Exchange credentials for an access/refresh token pair
    pub async fn issue_token(&self, username: &str, password: &str) -> Result<TokenPair> {
        let body = json!({ "username": username, "password": password });
        let response = self
            .send(Method::POST, "api/v1/token", None, Some(&body))
            .await
            .context("Failed to send authentication request")?;
        response.json().await.context("Failed to parse token response")
    }

    /// Load the user behind `token`, or the anonymous user when there is none
    pub async fn load_user(&self, token: Option<&str>) -> Result<LoginPayload> {
        let path = if token.is_some() {
            "api/v1/users/me"
        } else {
            "api/v1/users/anonymous"
        };
        debug!(path = path, "Loading user");
        self.get(path, token).await.context("Failed to load user")
    }

    async fn patch_user(&self, user_id: &str, operations: serde_json::Value) -> Result<()> {
        let path = format!("api/v1/users/{}", user_id);
        let body = json!({ "operations": operations });
        self.send(Method::PATCH, &path, self.token(), Some(&body)).await?;
        Ok(())
    }

    /// Persist the user's theme preference
    pub async fn set_theme(&self, user_id: &str, theme: &str) -> Result<()> {
        self.patch_user(
            user_id,
            json!([{ "operation": "update", "path": "/preferences/theme", "value": theme }]),
        )
        .await
        .context("Failed to update theme preference")
    }

    /// Change the user's password
    pub async fn change_password(&self, user_id: &str, current: &str, new: &str) -> Result<()> {
        self.patch_user(
            user_id,
            json!([{
                "operation": "update",
                "path": "/password",
                "value": { "current_password": current, "new_password": new },
            }]),
        )
        .await
        .context("Failed to change password")
    }

    // ===== Systems =====

    /// Fetch the system catalog without nested dereferencing
    pub async fn get_systems(&self) -> Result<Vec<System>> {
        let path = format!(
            "api/v1/systems?dereference_nested=false&include_fields={}",
            SYSTEM_INCLUDE_FIELDS
        );
        self.get(&path, self.token()).await.context("Failed to fetch systems")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:2337/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:2337");
        assert_eq!(client.url("/config"), "http://localhost:2337/config");
        assert_eq!(client.url("api/v1/systems"), "http://localhost:2337/api/v1/systems");
    }

    #[test]
    fn test_event_socket_endpoint() {
        let client = ApiClient::new("https://garden.example.com").unwrap();
        assert_eq!(
            client.event_socket_endpoint(),
            "wss://garden.example.com/api/v1/socket/events/"
        );

        let client = ApiClient::new("http://localhost:2337").unwrap();
        assert_eq!(
            client.event_socket_endpoint(),
            "ws://localhost:2337/api/v1/socket/events/"
        );
    }
}
