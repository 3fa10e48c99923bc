//! Tab-specific content rendering.

pub mod dashboard;
pub mod routes;
pub mod tanks;
pub mod volumes;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use dairyview_core::poll::SnapshotSlot;

use crate::ui::styles;

/// Draw the loading or error body for a slot with nothing to show yet.
/// Returns the snapshot when there is one.
pub(crate) fn snapshot_or_placeholder<'a, T>(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    slot: &'a SnapshotSlot<T>,
) -> Option<&'a T> {
    if let Some(snapshot) = slot.get() {
        return Some(snapshot);
    }

    let lines = match slot.error() {
        Some(error) => vec![
            Line::from(""),
            Line::from(Span::styled(format!("  {}", error), styles::error_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("  Press ", styles::muted_style()),
                Span::styled("r", styles::help_key_style()),
                Span::styled(" to try again", styles::muted_style()),
            ]),
        ],
        None => vec![
            Line::from(""),
            Line::from(Span::styled("  Loading...", styles::muted_style())),
        ],
    };

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
    None
}
