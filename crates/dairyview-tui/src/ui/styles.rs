use ratatui::style::{Color, Modifier, Style};

use dairyview_core::models::{RouteStatus, TankStatus};

// Color palette
pub const PRIMARY: Color = Color::Rgb(64, 128, 192);
pub const SECONDARY: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const ERROR: Color = Color::Rgb(192, 64, 64);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 64);

// Styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn success_style() -> Style {
    Style::default().fg(SECONDARY)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(PRIMARY)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}


pub fn tank_status_style(status: TankStatus) -> Style {
    match status {
        TankStatus::Normal => success_style(),
        TankStatus::Warning => highlight_style(),
        TankStatus::Critical => error_style().add_modifier(Modifier::BOLD),
        TankStatus::Washing => Style::default().fg(PRIMARY),
        TankStatus::Unknown => muted_style(),
    }
}

pub fn route_status_style(status: RouteStatus) -> Style {
    match status {
        RouteStatus::Active => success_style(),
        RouteStatus::Scheduled => highlight_style(),
        RouteStatus::Completed | RouteStatus::Closed => muted_style(),
        RouteStatus::Unknown => muted_style(),
    }
}

/// Gauge color for a fill ratio (0.0 - 1.0)
pub fn fill_color(ratio: f64) -> Color {
    if ratio >= 0.9 {
        ERROR
    } else if ratio >= 0.75 {
        ACCENT
    } else {
        SECONDARY
    }
}
