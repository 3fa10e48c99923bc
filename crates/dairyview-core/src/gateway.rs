//! Data access gateway.
//!
//! Every resource read goes through `Gateway`, which attaches the current
//! session's token, refuses to call out without a valid session, and turns an
//! HTTP 401 into a forced logout. The gateway is the only place that reacts to
//! a rejected token this way.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{Session, SessionManager};
use crate::config::Config;
use crate::models::{DashboardSummary, DataFreshness, RoutesSnapshot, TanksSnapshot, VolumesSnapshot};
use crate::source::{DataSource, DemoSource, HttpSource};
use crate::utils::{current_month, is_valid_month};

/// Dashboard view payload: the summary plus the tank list backing its alerts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardOverview {
    pub summary: DashboardSummary,
    pub tanks: TanksSnapshot,
}

/// Clone is cheap - source and session manager are shared via Arc.
#[derive(Clone)]
pub struct Gateway {
    source: Arc<dyn DataSource>,
    sessions: Arc<SessionManager>,
}

impl Gateway {
    pub fn new(source: Arc<dyn DataSource>, sessions: Arc<SessionManager>) -> Self {
        Self { source, sessions }
    }

    /// Pick the live or generated source once, from configuration.
    pub fn from_config(config: &Config, demo: bool, sessions: Arc<SessionManager>) -> Result<Self> {
        let source: Arc<dyn DataSource> = if demo {
            Arc::new(DemoSource::new(Duration::from_millis(config.demo_latency_ms)))
        } else {
            let api = ApiClient::new(
                &config.api_base_url,
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Arc::new(HttpSource::new(api))
        };
        debug!(source = source.name(), "Gateway configured");
        Ok(Self::new(source, sessions))
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    fn session(&self) -> Result<Session, ApiError> {
        self.sessions.valid_session().ok_or(ApiError::NoSession)
    }

    /// Apply the 401 policy to a finished request. Only the session the
    /// request was issued with is ended; a newer login survives a late 401.
    fn settle<T>(&self, resource: &str, issued: &Session, result: Result<T, ApiError>) -> Result<T, ApiError> {
        match result {
            Err(ApiError::SessionExpired) => {
                warn!(resource, "Token rejected");
                self.sessions.expire_if(&issued.token);
                Err(ApiError::SessionExpired)
            }
            Err(e) => {
                debug!(resource, error = %e, "Fetch failed");
                Err(e)
            }
            ok => ok,
        }
    }

    pub async fn dashboard(&self, tenant_id: &str) -> Result<DashboardSummary, ApiError> {
        let session = self.session()?;
        let result = self.source.dashboard(&session.token, tenant_id).await;
        self.settle("dashboard", &session, result)
    }

    pub async fn tanks(&self, tenant_id: &str) -> Result<TanksSnapshot, ApiError> {
        let session = self.session()?;
        let result = self.source.tanks(&session.token, tenant_id).await;
        self.settle("tanks", &session, result)
    }

    pub async fn routes(&self, tenant_id: &str) -> Result<RoutesSnapshot, ApiError> {
        let session = self.session()?;
        let result = self.source.routes(&session.token, tenant_id).await;
        self.settle("routes", &session, result)
    }

    /// Volumes for `month` (`YYYY-MM`), defaulting to the current month
    pub async fn volumes(&self, tenant_id: &str, month: Option<&str>) -> Result<VolumesSnapshot, ApiError> {
        let month = month.map(str::to_string).unwrap_or_else(current_month);
        if !is_valid_month(&month) {
            return Err(ApiError::InvalidMonth(month));
        }
        let session = self.session()?;
        let result = self.source.volumes(&session.token, tenant_id, &month).await;
        self.settle("volumes", &session, result)
    }

    pub async fn data_freshness(&self, tenant_id: &str) -> Result<DataFreshness, ApiError> {
        let session = self.session()?;
        let result = self.source.data_freshness(&session.token, tenant_id).await;
        self.settle("data_freshness", &session, result)
    }

    /// Summary and tanks fetched concurrently; fails if either fails.
    pub async fn overview(&self, tenant_id: &str) -> Result<DashboardOverview, ApiError> {
        let (summary, tanks) = futures::try_join!(self.dashboard(tenant_id), self.tanks(tenant_id))?;
        Ok(DashboardOverview { summary, tanks })
    }
}
