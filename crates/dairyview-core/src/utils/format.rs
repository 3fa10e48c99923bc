use chrono::{DateTime, Datelike, Local, Months, NaiveDate, Utc};

/// Format a count compactly: 71087296 -> "71.1M", 24160 -> "24K", 950 -> "950"
pub fn format_number(num: i64) -> String {
    let abs = num.unsigned_abs();
    if abs >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if abs >= 1_000 {
        format!("{:.0}K", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

/// Format a volume with thousands separators: 102400 -> "102,400"
pub fn format_volume(num: i64) -> String {
    let digits = num.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if num < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local));
    }
    // Naive timestamps from the API are UTC
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().with_timezone(&Local))
}

/// Format a timestamp in local time: "Jun 05, 2025 09:58"
pub fn format_date_time(value: &str) -> String {
    match parse_timestamp(value) {
        Some(dt) => dt.format("%b %d, %Y %H:%M").to_string(),
        None => value.to_string(),
    }
}

/// Time only for today, otherwise "M/D HH:MM"
pub fn format_compact_date_time(value: &str, now: DateTime<Local>) -> String {
    match parse_timestamp(value) {
        Some(dt) if dt.date_naive() == now.date_naive() => dt.format("%H:%M").to_string(),
        Some(dt) => format!("{}/{} {}", dt.month(), dt.day(), dt.format("%H:%M")),
        None => value.to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

// ===== Months =====

pub fn month_of(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// The current month as `YYYY-MM`
pub fn current_month() -> String {
    month_of(Utc::now())
}

fn first_day(month: &str) -> Option<NaiveDate> {
    if month.len() != 7 {
        return None;
    }
    NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").ok()
}

pub fn is_valid_month(month: &str) -> bool {
    first_day(month).is_some()
}

/// Move a `YYYY-MM` month forward or back. Invalid input is returned unchanged.
pub fn shift_month(month: &str, delta: i32) -> String {
    let Some(day) = first_day(month) else {
        return month.to_string();
    };
    let shifted = if delta >= 0 {
        day.checked_add_months(Months::new(delta as u32))
    } else {
        day.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_else(|| month.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(71_087_296), "71.1M");
        assert_eq!(format_number(24_160), "24K");
        assert_eq!(format_number(1_500), "2K");
        assert_eq!(format_number(950), "950");
        assert_eq!(format_number(0), "0");
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(102_400), "102,400");
        assert_eq!(format_volume(999), "999");
        assert_eq!(format_volume(1_000_000), "1,000,000");
        assert_eq!(format_volume(-4_200), "-4,200");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(73.24), "73.2%");
        assert_eq!(format_percentage(0.0), "0.0%");
    }

    #[test]
    fn test_format_date_time_passthrough() {
        assert_eq!(format_date_time("not a date"), "not a date");
        assert!(format_date_time("2025-06-05T09:58:00Z").contains("2025"));
        assert!(format_date_time("2025-06-05T09:58:00").contains("2025"));
    }

    #[test]
    fn test_format_compact_date_time() {
        let now = Local.with_ymd_and_hms(2025, 6, 5, 12, 0, 0).unwrap();
        let today = now.with_timezone(&Utc).to_rfc3339();
        assert_eq!(format_compact_date_time(&today, now), "12:00");

        let earlier = (now - chrono::Duration::days(2)).with_timezone(&Utc).to_rfc3339();
        assert_eq!(format_compact_date_time(&earlier, now), "6/3 12:00");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_months() {
        assert!(is_valid_month("2025-06"));
        assert!(!is_valid_month("2025-13"));
        assert!(!is_valid_month("2025-6"));
        assert!(!is_valid_month("June"));
        assert_eq!(shift_month("2025-01", -1), "2024-12");
        assert_eq!(shift_month("2025-12", 1), "2026-01");
        assert_eq!(shift_month("bogus", 1), "bogus");
        assert_eq!(month_of(Utc.with_ymd_and_hms(2025, 6, 30, 23, 0, 0).unwrap()), "2025-06");
    }
}
