//! Where snapshots come from.
//!
//! `DataSource` is implemented by `HttpSource` (the live API) and `DemoSource`
//! (generated data, no network). The gateway picks one at construction.

pub mod demo;
pub mod http;

use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::{DashboardSummary, DataFreshness, RoutesSnapshot, TanksSnapshot, VolumesSnapshot};

pub use demo::DemoSource;
pub use http::HttpSource;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn dashboard(&self, token: &str, tenant_id: &str) -> Result<DashboardSummary, ApiError>;

    async fn tanks(&self, token: &str, tenant_id: &str) -> Result<TanksSnapshot, ApiError>;

    async fn routes(&self, token: &str, tenant_id: &str) -> Result<RoutesSnapshot, ApiError>;

    async fn volumes(&self, token: &str, tenant_id: &str, month: &str) -> Result<VolumesSnapshot, ApiError>;

    async fn data_freshness(&self, token: &str, tenant_id: &str) -> Result<DataFreshness, ApiError>;
}
