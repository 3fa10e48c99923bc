use async_trait::async_trait;

use crate::api::{ApiClient, ApiError};
use crate::models::{DashboardSummary, DataFreshness, RoutesSnapshot, TanksSnapshot, VolumesSnapshot};

use super::DataSource;

/// Live source backed by the REST API.
#[derive(Clone)]
pub struct HttpSource {
    api: ApiClient,
}

impl HttpSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn dashboard(&self, token: &str, tenant_id: &str) -> Result<DashboardSummary, ApiError> {
        self.api.fetch_dashboard(token, tenant_id).await
    }

    async fn tanks(&self, token: &str, tenant_id: &str) -> Result<TanksSnapshot, ApiError> {
        self.api.fetch_tanks(token, tenant_id).await
    }

    async fn routes(&self, token: &str, tenant_id: &str) -> Result<RoutesSnapshot, ApiError> {
        self.api.fetch_routes(token, tenant_id).await
    }

    async fn volumes(&self, token: &str, tenant_id: &str, month: &str) -> Result<VolumesSnapshot, ApiError> {
        self.api.fetch_volumes(token, tenant_id, month).await
    }

    async fn data_freshness(&self, token: &str, tenant_id: &str) -> Result<DataFreshness, ApiError> {
        self.api.fetch_data_freshness(token, tenant_id).await
    }
}
