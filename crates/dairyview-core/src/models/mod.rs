//! Data models for dairy resources.
//!
//! Each snapshot is an immutable read of one endpoint and is replaced
//! wholesale on every fetch:
//!
//! - `DashboardSummary`: operation overview counters
//! - `TanksSnapshot`, `Tank`: tank volumes and wash status
//! - `RoutesSnapshot`, `Route`: today's pickup routes
//! - `VolumesSnapshot`, `CustomerSummary`: monthly volumes per processor

pub mod dashboard;
pub mod route;
pub mod tank;
pub mod volume;

pub use dashboard::{DashboardSummary, DataFreshness};
pub use route::{Location, Route, RouteId, RouteStatus, RoutesSnapshot};
pub use tank::{Tank, TankStatus, TanksSnapshot, WASH_THRESHOLD_VOLUME};
pub use volume::{CustomerSummary, VolumeEntry, VolumesSnapshot};
