//! Login strategies: the live API endpoint or the offline demo account.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::api::{ApiClient, ApiError, LoginResponse};

use super::Credentials;

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo";
pub const DEMO_TOKEN_PREFIX: &str = "demo-token-";
pub const DEMO_TENANT_NAME: &str = "Sunrise Valley Dairy";
pub const DEMO_TENANT_ID: &str = "demo-dairy-001";
/// Demo sessions last 24 hours
pub const DEMO_EXPIRES_IN_SECS: i64 = 86_400;

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    /// Whether sessions from this authenticator carry the demo marker
    fn is_demo(&self) -> bool {
        false
    }
}

/// Authenticates against `POST /api/auth/login`.
pub struct HttpAuthenticator {
    api: ApiClient,
}

impl HttpAuthenticator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.api.login(credentials).await
    }
}

/// Accepts only the demo account and mints a local token without a network call.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoAuthenticator;

#[async_trait]
impl Authenticator for DemoAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        if credentials.username != DEMO_USERNAME || credentials.password != DEMO_PASSWORD {
            return Err(ApiError::InvalidCredentials);
        }

        info!("Demo login");
        Ok(LoginResponse {
            token: format!("{}{}", DEMO_TOKEN_PREFIX, Utc::now().timestamp_millis()),
            dairy_name: DEMO_TENANT_NAME.to_string(),
            dairy_id: DEMO_TENANT_ID.to_string(),
            expires_in: DEMO_EXPIRES_IN_SECS,
        })
    }

    fn is_demo(&self) -> bool {
        true
    }
}
