use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use dairyview_core::models::{Route, RoutesSnapshot};
use dairyview_core::utils::format_date_time;

use crate::app::App;
use crate::ui::styles;
use crate::ui::tabs::snapshot_or_placeholder;

/// Render the Routes tab - today's pickups with a detail panel
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(snapshot) = snapshot_or_placeholder(frame, area, "Routes", &app.routes) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_route_table(frame, app, snapshot, chunks[0]);
    render_route_detail(frame, snapshot.routes.get(app.routes_selection), chunks[1]);
}

fn render_route_table(frame: &mut Frame, app: &App, snapshot: &RoutesSnapshot, area: Rect) {
    let header = Row::new([
        Cell::from("Route"),
        Cell::from("Driver"),
        Cell::from("Truck"),
        Cell::from("Status"),
        Cell::from("ETA"),
        Cell::from("Tank"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = snapshot
        .routes
        .iter()
        .map(|route| {
            Row::new(vec![
                Cell::from(route.route_number.clone()),
                Cell::from(route.driver_display().to_string()),
                Cell::from(route.truck_id.clone().unwrap_or_default()),
                Cell::from(Span::styled(route.status.label(), styles::route_status_style(route.status))),
                Cell::from(route.eta_display().to_string()),
                Cell::from(route.tank_number.clone().unwrap_or_default()),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Fill(2),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(6),
    ];

    let active = snapshot.active().len();
    let date = if snapshot.date.is_empty() { "Today" } else { snapshot.date.as_str() };
    let title = format!(" Routes - {} ({} total, {} active) ", date, snapshot.routes.len(), active);

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
    if !snapshot.routes.is_empty() {
        state.select(Some(app.routes_selection));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_route_detail(frame: &mut Frame, route: Option<&Route>, area: Rect) {
    let (title, lines) = match route {
        Some(route) => {
            let field = |label: &str, value: String| {
                Line::from(vec![
                    Span::styled(format!("{:<12}", label), styles::muted_style()),
                    Span::raw(value),
                ])
            };
            let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

            let mut lines = vec![
                field("Status", route.status.label().to_string()),
                field("Driver", route.driver_display().to_string()),
                field("Truck", or_dash(&route.truck_id)),
                field("Tank", or_dash(&route.tank_number)),
                field("Processor", or_dash(&route.processor)),
                field("LT number", or_dash(&route.lt_number)),
                field(
                    "ETA",
                    route
                        .estimated_arrival
                        .as_deref()
                        .filter(|_| !route.status.is_finished())
                        .map(format_date_time)
                        .unwrap_or_else(|| route.eta_display().to_string()),
                ),
            ];
            if let Some(location) = route.current_location {
                lines.push(field("Location", format!("{:.4}, {:.4}", location.lat, location.lng)));
            }
            if let Some(ref link) = route.tracking_link {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("Tracking", styles::highlight_style())));
                lines.push(Line::from(link.clone()));
            }
            (format!(" Route {} ", route.route_number), lines)
        }
        None => (
            " No Route Selected ".to_string(),
            vec![Line::from(Span::styled("No routes scheduled today", styles::muted_style()))],
        ),
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
