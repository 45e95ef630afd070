// Screen layout: panel arrangement and sizing.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Recent Matches (fill)                             |
// |                              +- Badge overlay --+ |
// |                              |                  | |
// |                              +------------------+ |
// +--------------------------------------------------+
// | Notice (1 row)                                    |
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Badge overlay size, borders included.
pub const BADGE_WIDTH: u16 = 36;
pub const BADGE_HEIGHT: u16 = 9;

/// Resolved screen areas for each zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: bridge connection, widget state, strategy.
    pub status_bar: Rect,
    /// Recent-matches table.
    pub main_panel: Rect,
    /// Last user-visible notice.
    pub notice: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
    /// Fixed position of the floating badge, over the main panel's
    /// bottom-right corner.
    pub badge: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(3),    // main panel
            Constraint::Length(1), // notice
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let main_panel = vertical[1];

    AppLayout {
        status_bar: vertical[0],
        main_panel,
        notice: vertical[2],
        help_bar: vertical[3],
        badge: badge_rect(main_panel),
    }
}

/// Bottom-right corner of `panel`, one cell in from its border, clamped to
/// fit.
pub fn badge_rect(panel: Rect) -> Rect {
    let width = BADGE_WIDTH.min(panel.width.saturating_sub(2));
    let height = BADGE_HEIGHT.min(panel.height.saturating_sub(2));
    Rect::new(
        panel.x + panel.width.saturating_sub(width + 1),
        panel.y + panel.height.saturating_sub(height + 1),
        width,
        height,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
