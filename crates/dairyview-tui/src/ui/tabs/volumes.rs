use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use dairyview_core::models::VolumesSnapshot;
use dairyview_core::utils::{format_percentage, format_volume};

use crate::app::App;
use crate::ui::styles;
use crate::ui::tabs::snapshot_or_placeholder;

/// Render the Volumes tab - monthly totals and per-customer breakdown
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!("Volumes - {}", app.volumes_month);
    let Some(snapshot) = snapshot_or_placeholder(frame, area, &title, &app.volumes) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(5)])
        .split(area);

    render_totals(frame, snapshot, chunks[0]);
    render_customers(frame, app, snapshot, chunks[1]);
}

fn render_totals(frame: &mut Frame, snapshot: &VolumesSnapshot, area: Rect) {
    let average = snapshot
        .average_pickup_volume()
        .map(|v| format!("{} lbs", format_volume(v)))
        .unwrap_or_else(|| "-".to_string());

    let lines = vec![
        Line::from(vec![
            Span::styled("Total volume    ", styles::muted_style()),
            Span::styled(format!("{} lbs", format_volume(snapshot.total_volume)), styles::title_style()),
        ]),
        Line::from(vec![
            Span::styled("Pickups         ", styles::muted_style()),
            Span::raw(snapshot.total_pickups.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Avg per pickup  ", styles::muted_style()),
            Span::raw(average),
        ]),
    ];

    let block = Block::default()
        .title(format!(" {} ", snapshot.month))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_customers(frame: &mut Frame, app: &App, snapshot: &VolumesSnapshot, area: Rect) {
    let customers = snapshot.customer_summaries();

    let header = Row::new([
        Cell::from("Customer"),
        Cell::from("Volume (lbs)"),
        Cell::from("Pickups"),
        Cell::from("Share"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = customers
        .iter()
        .map(|c| {
            Row::new(vec![
                Cell::from(c.customer.clone()),
                Cell::from(format!("{:>12}", format_volume(c.total_weight))),
                Cell::from(format!("{:>7}", c.invoice_count)),
                Cell::from(format!("{:>6}", format_percentage(c.market_share))),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Length(13),
        Constraint::Length(8),
        Constraint::Length(7),
    ];

    let block = Block::default()
        .title(format!(" Customers ({}) ", customers.len()))
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if customers.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No pickups recorded this month",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.volumes_selection));
    frame.render_stateful_widget(table, area, &mut state);
}
