use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Scheduled,
    Active,
    Completed,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl RouteStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RouteStatus::Scheduled => "Scheduled",
            RouteStatus::Active => "Active",
            RouteStatus::Completed => "Completed",
            RouteStatus::Closed => "Closed",
            RouteStatus::Unknown => "Unknown",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RouteStatus::Completed | RouteStatus::Closed)
    }
}

/// Route ids are integers on older deployments and UUID strings on newer ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteId {
    Number(i64),
    Text(String),
}

impl Default for RouteId {
    fn default() -> Self {
        RouteId::Number(0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteId::Number(n) => write!(f, "{}", n),
            RouteId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub id: RouteId,
    #[serde(default)]
    pub route_number: String,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub status: RouteStatus,
    #[serde(default)]
    pub estimated_arrival: Option<String>,
    #[serde(alias = "tank", default)]
    pub tank_number: Option<String>,
    #[serde(default)]
    pub dairy_name: Option<String>,
    #[serde(default)]
    pub processor: Option<String>,
    #[serde(default)]
    pub lt_number: Option<String>,
    #[serde(default)]
    pub tracking_link: Option<String>,
    #[serde(default)]
    pub current_location: Option<Location>,
}

impl Route {
    pub fn driver_display(&self) -> &str {
        self.driver_name.as_deref().filter(|d| !d.is_empty()).unwrap_or("Unassigned")
    }

    pub fn eta_display(&self) -> &str {
        if self.status.is_finished() {
            return "closed";
        }
        self.estimated_arrival.as_deref().unwrap_or("-")
    }
}

/// Today's pickup routes for one dairy (`GET /api/routes/{id}/today`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutesSnapshot {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub routes: Vec<Route>,
}

impl RoutesSnapshot {
    pub fn count_by_status(&self) -> BTreeMap<RouteStatus, usize> {
        let mut counts = BTreeMap::new();
        for route in &self.routes {
            *counts.entry(route.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn active(&self) -> Vec<&Route> {
        self.routes
            .iter()
            .filter(|r| r.status == RouteStatus::Active)
            .collect()
    }
}
