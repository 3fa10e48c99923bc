//! API client for communicating with the dairy operations REST API.
//!
//! This module provides the `ApiClient` struct for logging in and making
//! authenticated requests for tank, route, volume and dashboard data.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::models::{DashboardSummary, DataFreshness, RoutesSnapshot, TanksSnapshot, VolumesSnapshot};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Successful response body of `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub dairy_name: String,
    pub dairy_id: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// API client for the dairy backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid API base URL {:?}: {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL {:?} cannot be used as a base", base_url.as_str());
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded,
    /// so tenant ids containing `/` or spaces stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidResponse("API base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Authenticate and return the raw login response
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["api", "auth", "login"])?;
        debug!(url = %url, username = %credentials.username, "Sending login request");

        let response = self.client.post(url).json(credentials).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Login rejected");
            return Err(match status.as_u16() {
                401 | 403 => ApiError::InvalidCredentials,
                code => ApiError::Http {
                    status: code,
                    message: ApiError::detail_message(status, &body),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
    }

    /// Check if response is successful, returning a typed error with body detail if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e)))
    }

    // ===== Data Fetching Methods =====

    pub async fn fetch_dashboard(&self, token: &str, dairy_id: &str) -> Result<DashboardSummary, ApiError> {
        let url = self.endpoint(&["api", "dashboard", dairy_id])?;
        self.get(token, url, &[]).await
    }

    pub async fn fetch_tanks(&self, token: &str, dairy_id: &str) -> Result<TanksSnapshot, ApiError> {
        let url = self.endpoint(&["api", "tanks", dairy_id])?;
        self.get(token, url, &[]).await
    }

    /// Fetch today's pickup routes
    pub async fn fetch_routes(&self, token: &str, dairy_id: &str) -> Result<RoutesSnapshot, ApiError> {
        let url = self.endpoint(&["api", "routes", dairy_id, "today"])?;
        self.get(token, url, &[]).await
    }

    /// Fetch the volume breakdown for a `YYYY-MM` month
    pub async fn fetch_volumes(
        &self,
        token: &str,
        dairy_id: &str,
        month: &str,
    ) -> Result<VolumesSnapshot, ApiError> {
        let url = self.endpoint(&["api", "volumes", dairy_id])?;
        self.get(token, url, &[("month", month)]).await
    }

    pub async fn fetch_data_freshness(&self, token: &str, dairy_id: &str) -> Result<DataFreshness, ApiError> {
        let url = self.endpoint(&["api", "data-freshness", dairy_id])?;
        self.get(token, url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5)).expect("client should build")
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("http://localhost:8000");
        let url = api.endpoint(&["api", "routes", "dairy-7", "today"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/routes/dairy-7/today");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let api = client("https://example.com/ops/");
        let url = api.endpoint(&["api", "tanks", "d1"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/ops/api/tanks/d1");
    }

    #[test]
    fn test_endpoint_encodes_tenant_id() {
        let api = client("http://localhost:8000");
        let url = api.endpoint(&["api", "tanks", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/tanks/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(ApiClient::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"token":"abc","dairy_name":"T&K Dairy","dairy_id":"401","expires_in":86400,"is_admin":false}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("login response should parse");
        assert_eq!(resp.token, "abc");
        assert_eq!(resp.dairy_name, "T&K Dairy");
        assert_eq!(resp.expires_in, 86400);
    }
}
