use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tanks at or below this volume are due for a wash.
pub const WASH_THRESHOLD_VOLUME: i64 = 5_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TankStatus {
    Normal,
    Warning,
    Critical,
    Washing,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TankStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TankStatus::Normal => "Normal",
            TankStatus::Warning => "Warning",
            TankStatus::Critical => "Critical",
            TankStatus::Washing => "Washing",
            TankStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(alias = "tank_name")]
    pub name: String,
    #[serde(default)]
    pub barn_name: Option<String>,
    #[serde(alias = "current_volume_lbs", default)]
    pub current_volume: i64,
    #[serde(alias = "capacity_lbs", default)]
    pub capacity: i64,
    #[serde(default)]
    pub fill_percentage: f64,
    #[serde(default)]
    pub status: TankStatus,
    #[serde(default)]
    pub is_milking: bool,
    #[serde(alias = "last_pulled_at", default)]
    pub last_pickup: Option<String>,
    #[serde(default)]
    pub estimated_full: Option<String>,
    #[serde(default)]
    pub wash_started_at: Option<String>,
    #[serde(default)]
    pub time_to_full_hours: Option<f64>,
}

impl Tank {
    /// Name including the barn when the dairy has several
    pub fn display_name(&self) -> String {
        match &self.barn_name {
            Some(barn) if !barn.is_empty() => format!("{} / {}", barn, self.name),
            _ => self.name.clone(),
        }
    }

    pub fn needs_wash(&self) -> bool {
        self.status != TankStatus::Washing && self.current_volume <= WASH_THRESHOLD_VOLUME
    }

    /// Fill percentage clamped for gauges
    pub fn fill_ratio(&self) -> f64 {
        (self.fill_percentage / 100.0).clamp(0.0, 1.0)
    }
}

/// Tank list for one dairy (`GET /api/tanks/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TanksSnapshot {
    #[serde(default)]
    pub dairy_id: String,
    #[serde(default)]
    pub tanks: Vec<Tank>,
    #[serde(default)]
    pub super_loads_available: Option<i64>,
}

impl TanksSnapshot {
    pub fn total_volume(&self) -> i64 {
        self.tanks.iter().map(|t| t.current_volume).sum()
    }

    pub fn total_capacity(&self) -> i64 {
        self.tanks.iter().map(|t| t.capacity).sum()
    }

    /// Combined fill across all tanks, 0 when no capacity is known
    pub fn utilization_percent(&self) -> f64 {
        let capacity = self.total_capacity();
        if capacity <= 0 {
            return 0.0;
        }
        self.total_volume() as f64 / capacity as f64 * 100.0
    }

    pub fn count_by_status(&self) -> BTreeMap<TankStatus, usize> {
        let mut counts = BTreeMap::new();
        for tank in &self.tanks {
            *counts.entry(tank.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn needing_wash(&self) -> Vec<&Tank> {
        self.tanks.iter().filter(|t| t.needs_wash()).collect()
    }

    /// Fullest first
    pub fn sorted_by_fill(&self) -> Vec<&Tank> {
        let mut tanks: Vec<&Tank> = self.tanks.iter().collect();
        tanks.sort_by(|a, b| {
            b.fill_percentage
                .total_cmp(&a.fill_percentage)
                .then_with(|| a.name.cmp(&b.name))
        });
        tanks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tank(name: &str, volume: i64, capacity: i64, status: TankStatus) -> Tank {
        Tank {
            name: name.to_string(),
            current_volume: volume,
            capacity,
            fill_percentage: if capacity > 0 { volume as f64 / capacity as f64 * 100.0 } else { 0.0 },
            status,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_frontend_shape() {
        let json = r#"{"dairy_id":"d1","tanks":[{"id":1,"name":"Tank 1","current_volume":4200,"capacity":140000,"fill_percentage":3.0,"status":"critical","last_pickup":"2025-06-05T09:58:00Z","estimated_full":"2025-06-06T09:00:00Z"}]}"#;
        let snap: TanksSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.tanks[0].status, TankStatus::Critical);
        assert_eq!(snap.tanks[0].last_pickup.as_deref(), Some("2025-06-05T09:58:00Z"));
        assert_eq!(snap.super_loads_available, None);
    }

    #[test]
    fn test_parse_backend_shape() {
        let json = r#"{"dairy_id":"d1","super_loads_available":2,"tanks":[{"barn_name":"Barn 1","tank_name":"Tank 2","current_volume_lbs":89200,"capacity_lbs":110000,"fill_percentage":81.1,"status":"washing","is_milking":true,"last_pulled_at":null}]}"#;
        let snap: TanksSnapshot = serde_json::from_str(json).unwrap();
        let t = &snap.tanks[0];
        assert_eq!(t.name, "Tank 2");
        assert_eq!(t.current_volume, 89_200);
        assert_eq!(t.capacity, 110_000);
        assert_eq!(t.status, TankStatus::Washing);
        assert!(t.is_milking);
        assert_eq!(t.display_name(), "Barn 1 / Tank 2");
        assert_eq!(snap.super_loads_available, Some(2));
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let t: Tank = serde_json::from_str(r#"{"name":"T","status":"overflowing"}"#).unwrap();
        assert_eq!(t.status, TankStatus::Unknown);
    }

    #[test]
    fn test_aggregates() {
        let snap = TanksSnapshot {
            dairy_id: "d1".into(),
            tanks: vec![
                tank("A", 4_200, 140_000, TankStatus::Critical),
                tank("B", 102_400, 170_000, TankStatus::Normal),
                tank("C", 4_950, 150_000, TankStatus::Warning),
                tank("D", 0, 110_000, TankStatus::Washing),
            ],
            super_loads_available: None,
        };
        assert_eq!(snap.total_volume(), 111_550);
        assert_eq!(snap.total_capacity(), 570_000);
        assert!((snap.utilization_percent() - 19.570).abs() < 0.01);

        let washing: Vec<&str> = snap.needing_wash().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(washing, vec!["A", "C"]);

        let counts = snap.count_by_status();
        assert_eq!(counts.get(&TankStatus::Normal), Some(&1));
        assert_eq!(counts.get(&TankStatus::Washing), Some(&1));

        let order: Vec<&str> = snap.sorted_by_fill().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_utilization_without_capacity() {
        assert_eq!(TanksSnapshot::default().utilization_percent(), 0.0);
    }
}
