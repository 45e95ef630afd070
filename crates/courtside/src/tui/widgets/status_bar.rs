// Status bar widget: bridge connection, widget state, session toggles.

use chrono::{DateTime, Local, Utc};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::{Capabilities, ConnectionStatus, WidgetStatus};
use crate::session::WidgetPhase;
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [bridge dot] [page capabilities] | [widget] | [flags] [refreshed]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let separator = || Span::styled(" | ", Style::default().fg(Color::Gray));

    let (dot, dot_color) = connection_indicator(state.connection_status);
    let mut spans = vec![
        Span::styled(format!(" {dot} "), Style::default().fg(dot_color)),
        Span::styled(
            page_label(state.connection_status, state.capabilities),
            Style::default().fg(Color::White),
        ),
        separator(),
    ];

    spans.push(Span::styled(
        widget_label(&state.widget),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    ));

    if state.widget.phase != WidgetPhase::Closed {
        spans.push(separator());
        spans.extend(flag_spans(&state.widget));
        if let Some(at) = state.widget.last_refresh {
            spans.push(Span::styled(
                format!(" {}", refreshed_label(at)),
                Style::default().fg(Color::Gray),
            ));
        }
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Return the connection dot character and its color.
pub fn connection_indicator(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connected => ("●", Color::Green),
        ConnectionStatus::Disconnected => ("●", Color::Red),
    }
}

/// What the companion page offers, e.g. "Page: pop-out, PiP".
pub fn page_label(status: ConnectionStatus, caps: Capabilities) -> String {
    if status == ConnectionStatus::Disconnected {
        return "No page".to_string();
    }
    let mut offered = Vec::new();
    if caps.document_pip {
        offered.push("pop-out");
    }
    if caps.video_pip {
        offered.push("PiP");
    }
    if offered.is_empty() {
        "Page: badge only".to_string()
    } else {
        format!("Page: {}", offered.join(", "))
    }
}

/// "Widget: closed", "Widget: loading (Pop-out)", "Widget: Badge 2/5".
pub fn widget_label(status: &WidgetStatus) -> String {
    let strategy = status.strategy.map(|s| s.label());
    match (status.phase, strategy) {
        (WidgetPhase::Closed, _) => "Widget: closed".to_string(),
        (WidgetPhase::Loading, Some(s)) => format!("Widget: loading ({s})"),
        (WidgetPhase::Loading, None) => "Widget: loading".to_string(),
        (WidgetPhase::Displaying { .. }, s) => {
            let mut label = format!("Widget: {}", s.unwrap_or("open"));
            if let Some((position, total)) = status.position {
                label.push_str(&format!(" {position}/{total}"));
            }
            label
        }
    }
}

/// Auto-refresh, sound and offline markers.
pub fn flag_spans(status: &WidgetStatus) -> Vec<Span<'static>> {
    let flag = |on: bool, label: &'static str| {
        let style = if on {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(label, style)
    };
    let mut spans = vec![
        flag(status.auto_refresh, "[auto]"),
        Span::raw(" "),
        flag(status.sound_enabled, "[sound]"),
    ];
    if status.offline {
        spans.push(Span::styled(
            " OFFLINE",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    spans
}

fn refreshed_label(at: DateTime<Utc>) -> String {
    format!("updated {}", at.with_timezone(&Local).format("%H:%M:%S"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::StrategyKind;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn connection_indicator_colors() {
        assert_eq!(
            connection_indicator(ConnectionStatus::Connected),
            ("●", Color::Green)
        );
        assert_eq!(
            connection_indicator(ConnectionStatus::Disconnected),
            ("●", Color::Red)
        );
    }

    #[test]
    fn page_label_lists_capabilities() {
        let both = Capabilities {
            document_pip: true,
            video_pip: true,
        };
        assert_eq!(page_label(ConnectionStatus::Disconnected, both), "No page");
        assert_eq!(
            page_label(ConnectionStatus::Connected, both),
            "Page: pop-out, PiP"
        );
        assert_eq!(
            page_label(ConnectionStatus::Connected, Capabilities::none()),
            "Page: badge only"
        );
    }

    #[test]
    fn widget_label_per_phase() {
        let mut status = WidgetStatus::default();
        assert_eq!(widget_label(&status), "Widget: closed");

        status.phase = WidgetPhase::Loading;
        status.strategy = Some(StrategyKind::PopOut);
        assert_eq!(widget_label(&status), "Widget: loading (Pop-out)");

        status.phase = WidgetPhase::Displaying { selected: 1 };
        status.strategy = Some(StrategyKind::FloatingBadge);
        status.position = Some((2, 5));
        assert_eq!(widget_label(&status), "Widget: Badge 2/5");
    }

    #[test]
    fn flags_mark_offline() {
        let status = WidgetStatus {
            auto_refresh: true,
            offline: true,
            ..WidgetStatus::default()
        };
        let spans = flag_spans(&status);
        assert_eq!(spans[0].style.fg, Some(Color::Green));
        assert_eq!(spans[2].style.fg, Some(Color::DarkGray));
        assert_eq!(spans.last().unwrap().content, " OFFLINE");
    }

    #[test]
    fn render_does_not_panic_with_defaults() {
        let mut terminal = Terminal::new(TestBackend::new(80, 1)).unwrap();
        let state = ViewState::default();
        terminal
            .draw(|frame| render(frame, frame.area(), &state))
            .unwrap();
    }
}
