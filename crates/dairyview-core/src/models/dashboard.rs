use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Operation overview for one dairy (`GET /api/dashboard/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub total_tanks: i64,
    #[serde(default)]
    pub tanks_full: i64,
    #[serde(default)]
    pub active_routes: i64,
    #[serde(default)]
    pub monthly_volume: i64,
    /// Percentage, 0-100
    #[serde(default)]
    pub capacity_utilization: f64,
    #[serde(default)]
    pub critical_alerts: i64,
}

impl DashboardSummary {
    pub fn has_critical_alerts(&self) -> bool {
        self.critical_alerts > 0
    }

    pub fn critical_alerts_display(&self) -> String {
        match self.critical_alerts {
            0 => "No critical alerts".to_string(),
            1 => "1 critical alert requiring attention".to_string(),
            n => format!("{} critical alerts requiring attention", n),
        }
    }
}

/// Last-update timestamps per upstream feed (`GET /api/data-freshness/{id}`).
/// Keys vary by deployment, values are ISO timestamps or null.
pub type DataFreshness = BTreeMap<String, Option<String>>;
