//! Generated data for demo mode.
//!
//! The generator functions are pure (time and randomness are passed in) so
//! their output can be checked in tests. `DemoSource` wraps them with an
//! artificial delay to behave like a network call.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::api::ApiError;
use crate::models::{
    DashboardSummary, DataFreshness, Location, Route, RouteId, RouteStatus, RoutesSnapshot, Tank,
    TankStatus, TanksSnapshot, VolumeEntry, VolumesSnapshot,
};

use super::DataSource;

/// Default artificial latency for generated responses
pub const DEFAULT_DEMO_LATENCY_MS: u64 = 500;

/// A tank at or above this fill counts as full
const FULL_PERCENT: f64 = 90.0;

struct TankSeed {
    barn: &'static str,
    name: &'static str,
    volume: i64,
    capacity: i64,
    /// Fill rate per hour while milking
    fill_rate: i64,
    /// Hours since the last pickup
    last_pickup_hours: i64,
    status: TankStatus,
}

const TANK_SEEDS: [TankSeed; 5] = [
    TankSeed { barn: "Milky Way (633)-Barn 1", name: "Tank 1", volume: 4_200, capacity: 140_000, fill_rate: 12_000, last_pickup_hours: 4, status: TankStatus::Critical },
    TankSeed { barn: "Milky Way (633)-Barn 1", name: "Tank 2", volume: 3_800, capacity: 140_000, fill_rate: 8_500, last_pickup_hours: 6, status: TankStatus::Warning },
    TankSeed { barn: "T&K Dairy-Barn 2", name: "Tank 1", volume: 89_200, capacity: 110_000, fill_rate: 15_000, last_pickup_hours: 8, status: TankStatus::Normal },
    TankSeed { barn: "T&K Dairy-Barn 2", name: "Tank 2", volume: 102_400, capacity: 170_000, fill_rate: 18_000, last_pickup_hours: 9, status: TankStatus::Normal },
    TankSeed { barn: "Dickman Dairy-Main", name: "Tank 1", volume: 4_950, capacity: 150_000, fill_rate: 20_000, last_pickup_hours: 7, status: TankStatus::Warning },
];

struct RouteSeed {
    route_number: &'static str,
    dairy: &'static str,
    tank: &'static str,
    lt_number: &'static str,
    driver: &'static str,
    truck: &'static str,
    status: RouteStatus,
    eta: &'static str,
}

const ROUTE_SEEDS: [RouteSeed; 3] = [
    RouteSeed { route_number: "79", dairy: "Dickman Dairy", tank: "1", lt_number: "YY51760", driver: "Jeffery Palacio", truck: "VEH-001", status: RouteStatus::Closed, eta: "closed" },
    RouteSeed { route_number: "74", dairy: "Milky Way (633)", tank: "2", lt_number: "LMH32001", driver: "Maria Rodriguez", truck: "VEH-015", status: RouteStatus::Active, eta: "7:28" },
    RouteSeed { route_number: "75", dairy: "T&K Dairy", tank: "1", lt_number: "NIM69133", driver: "Unknown Driver", truck: "VEH-022", status: RouteStatus::Scheduled, eta: "9:15" },
];

/// (customer, monthly weight, pickups) for a typical month
const CUSTOMER_SEEDS: [(&str, i64, i64); 5] = [
    ("Fairlife", 24_160_296, 329),
    ("Schreiber", 15_709_244, 214),
    ("UDA", 14_285_456, 195),
    ("Horizon", 10_652_592, 145),
    ("Clover", 6_279_708, 86),
];

fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn generate_tanks<R: Rng>(tenant_id: &str, now: DateTime<Utc>, rng: &mut R) -> TanksSnapshot {
    let tanks = TANK_SEEDS
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            // Low tanks are waiting on a wash and do not move
            let volume = if seed.volume <= crate::models::WASH_THRESHOLD_VOLUME {
                seed.volume
            } else {
                let jitter: f64 = rng.gen_range(-0.03..=0.03);
                ((seed.volume as f64) * (1.0 + jitter)).round() as i64
            }
            .min(seed.capacity);

            let fill_percentage = volume as f64 / seed.capacity as f64 * 100.0;
            let status = match seed.status {
                TankStatus::Normal if fill_percentage >= FULL_PERCENT => TankStatus::Critical,
                TankStatus::Normal if fill_percentage >= 80.0 => TankStatus::Warning,
                other => other,
            };
            let hours_to_full = (seed.capacity - volume) as f64 / seed.fill_rate as f64;

            Tank {
                id: Some(i as i64 + 1),
                name: seed.name.to_string(),
                barn_name: Some(seed.barn.to_string()),
                current_volume: volume,
                capacity: seed.capacity,
                fill_percentage,
                status,
                is_milking: status != TankStatus::Washing,
                last_pickup: Some(iso(now - ChronoDuration::hours(seed.last_pickup_hours))),
                estimated_full: Some(iso(now + ChronoDuration::minutes((hours_to_full * 60.0) as i64))),
                wash_started_at: None,
                time_to_full_hours: Some((hours_to_full * 10.0).round() / 10.0),
            }
        })
        .collect();

    TanksSnapshot {
        dairy_id: tenant_id.to_string(),
        tanks,
        super_loads_available: Some(rng.gen_range(0..=3)),
    }
}

pub fn generate_routes<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> RoutesSnapshot {
    let today = now.date_naive();
    let routes = ROUTE_SEEDS
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let current_location = (seed.status == RouteStatus::Active).then(|| Location {
                lat: 33.4584 + rng.gen_range(-0.01..=0.01),
                lng: -112.0840 + rng.gen_range(-0.01..=0.01),
            });
            Route {
                id: RouteId::Number(i as i64 + 1),
                route_number: seed.route_number.to_string(),
                driver_name: Some(seed.driver.to_string()),
                truck_id: Some(seed.truck.to_string()),
                status: seed.status,
                estimated_arrival: Some(seed.eta.to_string()),
                tank_number: Some(seed.tank.to_string()),
                dairy_name: Some(seed.dairy.to_string()),
                processor: Some("Fairlife".to_string()),
                lt_number: Some(seed.lt_number.to_string()),
                tracking_link: Some(format!("https://track.example.com/{}", seed.lt_number)),
                current_location,
            }
        })
        .collect();

    RoutesSnapshot {
        date: today.format("%Y-%m-%d").to_string(),
        routes,
    }
}

/// Volumes for a month. Seeded from the month so the same month always
/// yields the same figures.
pub fn generate_volumes(month: &str) -> VolumesSnapshot {
    let seed = month.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let mut rng = StdRng::seed_from_u64(seed);
    let scale: f64 = rng.gen_range(0.85..=1.15);

    let volumes: Vec<VolumeEntry> = CUSTOMER_SEEDS
        .iter()
        .map(|(customer, weight, pickups)| VolumeEntry {
            date: format!("{}-01", month),
            volume: (*weight as f64 * scale).round() as i64,
            pickups: (*pickups as f64 * scale).round() as i64,
            customer: customer.to_string(),
        })
        .collect();

    VolumesSnapshot {
        month: month.to_string(),
        total_volume: volumes.iter().map(|v| v.volume).sum(),
        total_pickups: volumes.iter().map(|v| v.pickups).sum(),
        volumes,
    }
}

/// Dashboard counters derived from the other generated snapshots so the
/// numbers agree across views.
pub fn summarize(tanks: &TanksSnapshot, routes: &RoutesSnapshot, volumes: &VolumesSnapshot) -> DashboardSummary {
    DashboardSummary {
        total_tanks: tanks.tanks.len() as i64,
        tanks_full: tanks
            .tanks
            .iter()
            .filter(|t| t.fill_percentage >= FULL_PERCENT)
            .count() as i64,
        active_routes: routes.active().len() as i64,
        monthly_volume: volumes.total_volume,
        capacity_utilization: (tanks.utilization_percent() * 10.0).round() / 10.0,
        critical_alerts: tanks
            .tanks
            .iter()
            .filter(|t| t.status == TankStatus::Critical)
            .count() as i64,
    }
}

pub fn generate_freshness(now: DateTime<Utc>) -> DataFreshness {
    ["tanks", "routes", "volumes"]
        .into_iter()
        .map(|feed| (feed.to_string(), Some(iso(now))))
        .collect()
}

/// Generated source used in demo mode. Never touches the network.
#[derive(Debug, Clone)]
pub struct DemoSource {
    latency: Duration,
}

impl DemoSource {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEMO_LATENCY_MS))
    }
}

fn validate_month(month: &str) -> Result<(), ApiError> {
    if crate::utils::is_valid_month(month) {
        Ok(())
    } else {
        Err(ApiError::InvalidMonth(month.to_string()))
    }
}

#[async_trait]
impl DataSource for DemoSource {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn dashboard(&self, _token: &str, tenant_id: &str) -> Result<DashboardSummary, ApiError> {
        self.simulate_latency().await;
        let now = Utc::now();
        let summary = {
            let mut rng = rand::thread_rng();
            let tanks = generate_tanks(tenant_id, now, &mut rng);
            let routes = generate_routes(now, &mut rng);
            let volumes = generate_volumes(&crate::utils::month_of(now));
            summarize(&tanks, &routes, &volumes)
        };
        debug!(tenant_id, "Generated demo dashboard");
        Ok(summary)
    }

    async fn tanks(&self, _token: &str, tenant_id: &str) -> Result<TanksSnapshot, ApiError> {
        self.simulate_latency().await;
        let mut rng = rand::thread_rng();
        Ok(generate_tanks(tenant_id, Utc::now(), &mut rng))
    }

    async fn routes(&self, _token: &str, _tenant_id: &str) -> Result<RoutesSnapshot, ApiError> {
        self.simulate_latency().await;
        let mut rng = rand::thread_rng();
        Ok(generate_routes(Utc::now(), &mut rng))
    }

    async fn volumes(&self, _token: &str, _tenant_id: &str, month: &str) -> Result<VolumesSnapshot, ApiError> {
        validate_month(month)?;
        self.simulate_latency().await;
        Ok(generate_volumes(month))
    }

    async fn data_freshness(&self, _token: &str, _tenant_id: &str) -> Result<DataFreshness, ApiError> {
        self.simulate_latency().await;
        Ok(generate_freshness(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_generated_tanks_are_consistent() {
        let now = Utc::now();
        let snap = generate_tanks("demo-dairy-001", now, &mut rng());
        assert_eq!(snap.dairy_id, "demo-dairy-001");
        assert_eq!(snap.tanks.len(), TANK_SEEDS.len());
        for tank in &snap.tanks {
            assert!(tank.current_volume <= tank.capacity);
            let expected = tank.current_volume as f64 / tank.capacity as f64 * 100.0;
            assert!((tank.fill_percentage - expected).abs() < 1e-9);
        }
        // the low tanks stay put and show up as wash candidates
        assert_eq!(snap.needing_wash().len(), 3);
    }

    #[test]
    fn test_generated_routes_have_one_active() {
        let snap = generate_routes(Utc::now(), &mut rng());
        assert_eq!(snap.routes.len(), 3);
        let active = snap.active();
        assert_eq!(active.len(), 1);
        assert!(active[0].current_location.is_some());
        assert!(snap.routes.iter().all(|r| r.status != RouteStatus::Active || r.current_location.is_some()));
    }

    #[test]
    fn test_volumes_are_stable_per_month() {
        let a = generate_volumes("2025-06");
        let b = generate_volumes("2025-06");
        assert_eq!(a, b);
        assert_eq!(a.total_volume, a.volumes.iter().map(|v| v.volume).sum::<i64>());
        assert!(a.volumes.iter().all(|v| v.date == "2025-06-01"));
        assert_ne!(generate_volumes("2025-05").total_volume, a.total_volume);
    }

    #[test]
    fn test_summary_matches_snapshots() {
        let now = Utc::now();
        let mut rng = rng();
        let tanks = generate_tanks("d", now, &mut rng);
        let routes = generate_routes(now, &mut rng);
        let volumes = generate_volumes("2025-06");
        let summary = summarize(&tanks, &routes, &volumes);
        assert_eq!(summary.total_tanks, 5);
        assert_eq!(summary.active_routes, 1);
        assert_eq!(summary.monthly_volume, volumes.total_volume);
        assert!(summary.critical_alerts >= 1);
    }

    #[tokio::test]
    async fn test_demo_source_rejects_bad_month() {
        let source = DemoSource::new(Duration::ZERO);
        let err = source.volumes("t", "d", "June").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidMonth(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_source_waits_before_answering() {
        let source = DemoSource::new(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        source.tanks("t", "d").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
