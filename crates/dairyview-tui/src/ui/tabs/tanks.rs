use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use dairyview_core::models::{Tank, TanksSnapshot};
use dairyview_core::utils::{format_compact_date_time, format_percentage, format_volume, truncate_string};

use crate::app::App;
use crate::ui::styles;
use crate::ui::tabs::snapshot_or_placeholder;

/// Render the Tanks tab - tank table with a detail panel for the selection
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(snapshot) = snapshot_or_placeholder(frame, area, "Tanks", &app.tanks) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_tank_table(frame, app, snapshot, chunks[0]);
    render_tank_detail(frame, snapshot.tanks.get(app.tanks_selection), chunks[1]);
}

fn status_summary(snapshot: &TanksSnapshot) -> String {
    snapshot
        .count_by_status()
        .iter()
        .map(|(status, count)| format!("{} {}", count, status.label().to_lowercase()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_tank_table(frame: &mut Frame, app: &App, snapshot: &TanksSnapshot, area: Rect) {
    let now = Local::now();

    let header = Row::new([
        Cell::from("Tank"),
        Cell::from("Status"),
        Cell::from("Volume"),
        Cell::from("Capacity"),
        Cell::from("Fill"),
        Cell::from("Last pickup"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = snapshot
        .tanks
        .iter()
        .map(|tank| {
            let fill = tank.fill_ratio();
            let last_pickup = tank
                .last_pickup
                .as_deref()
                .map(|v| format_compact_date_time(v, now))
                .unwrap_or_else(|| "-".to_string());
            let name = if tank.needs_wash() {
                format!("{} *", truncate_string(&tank.display_name(), 28))
            } else {
                truncate_string(&tank.display_name(), 30)
            };

            Row::new(vec![
                Cell::from(name),
                Cell::from(Span::styled(tank.status.label(), styles::tank_status_style(tank.status))),
                Cell::from(format!("{:>10}", format_volume(tank.current_volume))),
                Cell::from(format!("{:>10}", format_volume(tank.capacity))),
                Cell::from(Span::styled(
                    format!("{:>6}", format_percentage(fill * 100.0)),
                    ratatui::style::Style::default().fg(styles::fill_color(fill)),
                )),
                Cell::from(last_pickup),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Length(9),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(7),
        Constraint::Length(12),
    ];

    let title = format!(
        " Tanks ({}) - {} lbs, {} utilized - {} ",
        snapshot.tanks.len(),
        format_volume(snapshot.total_volume()),
        format_percentage(snapshot.utilization_percent()),
        status_summary(snapshot),
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    if !snapshot.tanks.is_empty() {
        state.select(Some(app.tanks_selection));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn detail_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<16}", label), styles::muted_style()),
        Span::raw(value),
    ])
}

fn render_tank_detail(frame: &mut Frame, tank: Option<&Tank>, area: Rect) {
    let now = Local::now();

    let (title, lines) = match tank {
        Some(tank) => {
            let optional = |v: &Option<String>| {
                v.as_deref()
                    .map(|s| format_compact_date_time(s, now))
                    .unwrap_or_else(|| "-".to_string())
            };
            let mut lines = vec![
                detail_line("Status", tank.status.label().to_string()),
                detail_line("Volume", format!("{} lbs", format_volume(tank.current_volume))),
                detail_line("Capacity", format!("{} lbs", format_volume(tank.capacity))),
                detail_line("Fill", format_percentage(tank.fill_ratio() * 100.0)),
                detail_line("Milking", if tank.is_milking { "yes" } else { "no" }.to_string()),
                Line::from(""),
                detail_line("Last pickup", optional(&tank.last_pickup)),
                detail_line("Estimated full", optional(&tank.estimated_full)),
            ];
            if let Some(hours) = tank.time_to_full_hours {
                lines.push(detail_line("Time to full", format!("{:.1} h", hours)));
            }
            if tank.wash_started_at.is_some() {
                lines.push(detail_line("Wash started", optional(&tank.wash_started_at)));
            }
            if tank.needs_wash() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("* Ready to wash", styles::highlight_style())));
            }
            (format!(" {} ", tank.display_name()), lines)
        }
        None => (
            " No Tank Selected ".to_string(),
            vec![Line::from(Span::styled("No tanks reported", styles::muted_style()))],
        ),
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
