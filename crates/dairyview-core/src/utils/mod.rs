//! Utility functions for formatting and month handling.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    current_month, format_compact_date_time, format_date_time, format_number, format_percentage,
    format_volume, is_valid_month, month_of, shift_month, truncate_string,
};
