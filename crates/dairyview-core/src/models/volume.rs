use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One handler's pickups within the month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub volume: i64,
    #[serde(alias = "pickup_count", default)]
    pub pickups: i64,
    #[serde(default)]
    pub customer: String,
}

/// Monthly volumes for one dairy (`GET /api/volumes/{id}?month=YYYY-MM`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumesSnapshot {
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub total_volume: i64,
    #[serde(alias = "total_pickup_count", default)]
    pub total_pickups: i64,
    #[serde(default)]
    pub volumes: Vec<VolumeEntry>,
}

/// Per-customer rollup of a month's volumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub customer: String,
    pub total_weight: i64,
    pub invoice_count: i64,
    /// Share of the month's volume, 0-100
    pub market_share: f64,
}

impl VolumesSnapshot {
    /// Group entries by customer, largest volume first.
    pub fn customer_summaries(&self) -> Vec<CustomerSummary> {
        let mut grouped: HashMap<&str, (i64, i64)> = HashMap::new();
        for entry in &self.volumes {
            let slot = grouped.entry(entry.customer.as_str()).or_insert((0, 0));
            slot.0 += entry.volume;
            slot.1 += entry.pickups;
        }

        let total: i64 = grouped.values().map(|(volume, _)| volume).sum();

        let mut summaries: Vec<CustomerSummary> = grouped
            .into_iter()
            .map(|(customer, (total_weight, invoice_count))| CustomerSummary {
                customer: customer.to_string(),
                total_weight,
                invoice_count,
                market_share: if total > 0 {
                    total_weight as f64 / total as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.total_weight
                .cmp(&a.total_weight)
                .then_with(|| a.customer.cmp(&b.customer))
        });
        summaries
    }

    pub fn average_pickup_volume(&self) -> Option<i64> {
        if self.total_pickups > 0 {
            Some(self.total_volume / self.total_pickups)
        } else {
            None
        }
    }
}
