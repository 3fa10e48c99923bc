use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated identity: bearer token plus the dairy (tenant) it is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub tenant_name: String,
    pub tenant_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a server-supplied lifetime in seconds, starting at `now`.
    /// Returns `None` when the lifetime does not fit in a timestamp.
    pub fn starting_at(
        now: DateTime<Utc>,
        token: String,
        tenant_name: String,
        tenant_id: String,
        expires_in_secs: i64,
    ) -> Option<Self> {
        let expires_at = now.checked_add_signed(Duration::try_seconds(expires_in_secs)?)?;
        Some(Self {
            token,
            tenant_name,
            tenant_id,
            expires_at,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }

    /// Expiry as unix milliseconds, the format kept in durable storage
    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }

    pub fn parse_expiry_millis(value: &str) -> Option<DateTime<Utc>> {
        let millis: i64 = value.trim().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring(expires_at: DateTime<Utc>) -> Session {
        Session {
            token: "t".to_string(),
            tenant_name: "Dairy".to_string(),
            tenant_id: "d1".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_starting_at_adds_lifetime() {
        let now = Utc::now();
        let s = Session::starting_at(now, "t".into(), "n".into(), "id".into(), 86400).unwrap();
        assert_eq!(s.expires_at - now, Duration::seconds(86400));
    }

    #[test]
    fn test_starting_at_rejects_lifetime_past_max_date() {
        let now = Utc::now();
        assert!(Session::starting_at(now, "t".into(), "n".into(), "id".into(), 100_000_000_000_000).is_none());
        assert!(Session::starting_at(now, "t".into(), "n".into(), "id".into(), i64::MAX).is_none());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let at = Utc::now();
        let s = session_expiring(at);
        assert!(s.is_expired_at(at));
        assert!(!s.is_expired_at(at - Duration::milliseconds(1)));
    }

    #[test]
    fn test_minutes_until_expiry_never_negative() {
        let s = session_expiring(Utc::now() - Duration::hours(2));
        assert_eq!(s.minutes_until_expiry(), 0);
    }

    #[test]
    fn test_expiry_millis_round_trip() {
        let s = session_expiring(Utc.timestamp_millis_opt(1_750_000_000_123).unwrap());
        let stored = s.expires_at_millis().to_string();
        assert_eq!(Session::parse_expiry_millis(&stored), Some(s.expires_at));
        assert_eq!(Session::parse_expiry_millis("soon"), None);
    }
}
