use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use dairyview_core::utils::{format_compact_date_time, format_number, format_percentage};
use dairyview_core::DashboardOverview;

use crate::app::App;
use crate::ui::styles;
use crate::ui::tabs::snapshot_or_placeholder;

/// Render the Dashboard tab - summary counters, utilization and attention lists
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(overview) = snapshot_or_placeholder(frame, area, "Dashboard", &app.overview) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stat cards
            Constraint::Length(3), // Utilization gauge
            Constraint::Min(5),    // Lists
        ])
        .split(area);

    render_stats(frame, overview, chunks[0]);
    render_utilization(frame, overview, chunks[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    render_attention(frame, overview, bottom[0]);
    render_freshness(frame, app, bottom[1]);
}

fn stat_card(frame: &mut Frame, area: Rect, label: &str, value: String, value_style: Style) {
    let lines = vec![
        Line::from(Span::styled(value, value_style)),
        Line::from(Span::styled(label.to_string(), styles::muted_style())),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_stats(frame: &mut Frame, overview: &DashboardOverview, area: Rect) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let summary = &overview.summary;
    stat_card(frame, cards[0], "Tanks", summary.total_tanks.to_string(), styles::title_style());
    stat_card(frame, cards[1], "Tanks full", summary.tanks_full.to_string(), styles::highlight_style());
    stat_card(frame, cards[2], "Active routes", summary.active_routes.to_string(), styles::success_style());
    stat_card(
        frame,
        cards[3],
        "Volume this month (lbs)",
        format_number(summary.monthly_volume),
        styles::title_style(),
    );
    let alert_style = if summary.has_critical_alerts() {
        styles::error_style()
    } else {
        styles::muted_style()
    };
    stat_card(frame, cards[4], "Critical alerts", summary.critical_alerts_display(), alert_style);
}

fn render_utilization(frame: &mut Frame, overview: &DashboardOverview, area: Rect) {
    let percent = overview.summary.capacity_utilization.clamp(0.0, 100.0);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Capacity utilization ")
                .title_style(styles::title_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(false)),
        )
        .gauge_style(Style::default().fg(styles::fill_color(percent / 100.0)))
        .ratio(percent / 100.0)
        .label(format_percentage(percent));
    frame.render_widget(gauge, area);
}

fn render_attention(frame: &mut Frame, overview: &DashboardOverview, area: Rect) {
    let mut lines = Vec::new();

    let critical: Vec<_> = overview
        .tanks
        .sorted_by_fill()
        .into_iter()
        .filter(|t| t.status == dairyview_core::models::TankStatus::Critical)
        .collect();
    lines.push(Line::from(Span::styled("Critical", styles::highlight_style())));
    if critical.is_empty() {
        lines.push(Line::from(Span::styled("  None", styles::muted_style())));
    }
    for tank in critical {
        lines.push(Line::from(vec![
            Span::raw(format!("  {:<28}", tank.display_name())),
            Span::styled(format!("{:>5.0}%", tank.fill_ratio() * 100.0), styles::error_style()),
        ]));
    }

    lines.push(Line::from(""));
    let needing_wash = overview.tanks.needing_wash();
    lines.push(Line::from(Span::styled(
        format!("Ready to wash ({})", needing_wash.len()),
        styles::highlight_style(),
    )));
    if needing_wash.is_empty() {
        lines.push(Line::from(Span::styled("  None", styles::muted_style())));
    }
    for tank in needing_wash {
        lines.push(Line::from(format!(
            "  {:<28}{:>10} lbs",
            tank.display_name(),
            format_number(tank.current_volume)
        )));
    }

    let block = Block::default()
        .title(" Needs attention ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_freshness(frame: &mut Frame, app: &App, area: Rect) {
    let now = Local::now();
    let lines: Vec<Line> = match app.freshness.get() {
        Some(freshness) if !freshness.is_empty() => freshness
            .iter()
            .map(|(feed, at)| {
                let value = at
                    .as_deref()
                    .map(|v| format_compact_date_time(v, now))
                    .unwrap_or_else(|| "never".to_string());
                Line::from(vec![
                    Span::raw(format!("  {:<18}", feed)),
                    Span::styled(value, styles::muted_style()),
                ])
            })
            .collect(),
        Some(_) => vec![Line::from(Span::styled("  No feeds reported", styles::muted_style()))],
        None => match app.freshness.error() {
            Some(error) => vec![Line::from(Span::styled(format!("  {}", error), styles::error_style()))],
            None => vec![Line::from(Span::styled("  Loading...", styles::muted_style()))],
        },
    };

    let block = Block::default()
        .title(" Data freshness ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
