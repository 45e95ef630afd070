// Recent matches widget: the dashboard table.
//
// Shows the matches in the recency window the dashboard feed settled on,
// newest first, with a scrollbar once the rows overflow the panel.

use ratatui::layout::{Constraint, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{
    Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
};
use ratatui::Frame;

use crate::protocol::{DashboardRow, DashboardView};
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let dashboard = &state.dashboard;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(build_title(dashboard));

    if dashboard.rows.is_empty() {
        let message = if dashboard.offline {
            "  Match data is unavailable."
        } else {
            "  No recent matches."
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    // Borders and the header row.
    let visible_rows = (area.height as usize).saturating_sub(3);
    let total = dashboard.rows.len();
    let scroll_offset = state
        .scroll_offset
        .min(total.saturating_sub(visible_rows));

    let header = Row::new(vec![
        Cell::from("When"),
        Cell::from("Status"),
        Cell::from("Players"),
        Cell::from("Score"),
        Cell::from("Tournament"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = dashboard
        .rows
        .iter()
        .skip(scroll_offset)
        .take(visible_rows.max(1))
        .map(|row| {
            Row::new(vec![
                Cell::from(row.when.clone()),
                Cell::from(row.status.clone()).style(Style::default().fg(status_color(row))),
                Cell::from(row.players.clone()),
                Cell::from(row.score.clone()),
                Cell::from(row.tournament.clone()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Length(9),
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Min(12),
    ];

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);

    if total > visible_rows {
        let mut scrollbar_state =
            ScrollbarState::new(total.saturating_sub(visible_rows)).position(scroll_offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// "Recent Matches: Today (3)", or "Recent Matches (offline)".
pub fn build_title(dashboard: &DashboardView) -> String {
    if dashboard.offline {
        return "Recent Matches (offline)".to_string();
    }
    match &dashboard.window {
        Some(window) => format!("Recent Matches: {window} ({})", dashboard.rows.len()),
        None => "Recent Matches".to_string(),
    }
}

pub fn status_color(row: &DashboardRow) -> Color {
    match row.status.as_str() {
        "LIVE" => Color::Red,
        "UPCOMING" => Color::Cyan,
        _ => Color::Gray,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn row(players: &str, status: &str) -> DashboardRow {
        DashboardRow {
            when: "Wed 15:00".into(),
            status: status.into(),
            players: players.into(),
            score: "6-3, 6-4".into(),
            tournament: "Club Open".into(),
        }
    }

    fn draw(state: &ViewState, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn title_names_window_and_count() {
        let dashboard = DashboardView {
            window: Some("This week".into()),
            rows: vec![row("A v B", "FINAL")],
            offline: false,
        };
        assert_eq!(build_title(&dashboard), "Recent Matches: This week (1)");
        assert_eq!(
            build_title(&DashboardView::default()),
            "Recent Matches"
        );
    }

    #[test]
    fn offline_title_wins() {
        let dashboard = DashboardView {
            window: Some("Today".into()),
            rows: Vec::new(),
            offline: true,
        };
        assert_eq!(build_title(&dashboard), "Recent Matches (offline)");
    }

    #[test]
    fn status_colors() {
        assert_eq!(status_color(&row("", "LIVE")), Color::Red);
        assert_eq!(status_color(&row("", "UPCOMING")), Color::Cyan);
        assert_eq!(status_color(&row("", "FINAL")), Color::Gray);
    }

    #[test]
    fn empty_dashboard_shows_message() {
        let text = draw(&ViewState::default(), 60, 5);
        assert!(text.contains("No recent matches."));
    }

    #[test]
    fn rows_render_from_scroll_offset() {
        let mut state = ViewState::default();
        state.dashboard.rows = (0..10)
            .map(|i| row(&format!("Player{i} v Rival{i}"), "FINAL"))
            .collect();
        state.scroll_offset = 3;

        let text = draw(&state, 100, 8);
        assert!(!text.contains("Player0 v Rival0"));
        assert!(text.contains("Player3 v Rival3"));
        assert!(text.contains("Players"));
    }
}
