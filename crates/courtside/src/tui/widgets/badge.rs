// Floating badge overlay: the always-available live-match widget, drawn in a
// fixed corner over the dashboard.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::present::ScoreView;

pub fn render(frame: &mut Frame, area: Rect, view: &ScoreView) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    frame.render_widget(Clear, area);

    let border_color = if view.offline {
        Color::DarkGray
    } else {
        Color::Green
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(" Live ");

    let paragraph = Paragraph::new(styled_lines(view))
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// `view.lines()` with the headline and score emphasized.
pub fn styled_lines(view: &ScoreView) -> Vec<Line<'static>> {
    let lines = view.lines();
    let score_row = view.card.as_ref().map(|_| 3);
    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == 0 {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else if Some(i) == score_row {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(text, style))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::tests::{live_match, utc};
    use courtside_core::model::MatchStatus;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn score_line_is_bold() {
        let view = ScoreView::for_match(
            &live_match(MatchStatus::Live, Some("6-4, 3-2")),
            1,
            1,
            false,
            utc(),
        );
        let lines = styled_lines(&view);
        assert_eq!(lines[3].spans[0].content, "6-4, 3-2");
        assert!(lines[3].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn renders_card_inside_area() {
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let view = ScoreView::for_match(
            &live_match(MatchStatus::Live, Some("6-4")),
            1,
            1,
            false,
            utc(),
        );
        terminal
            .draw(|frame| render(frame, Rect::new(2, 1, 36, 9), &view))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Ana Ruiz"));
        assert!(text.contains("Live"));
    }

    #[test]
    fn tiny_area_is_skipped() {
        let mut terminal = Terminal::new(TestBackend::new(10, 4)).unwrap();
        let view = ScoreView::placeholder("No matches", false);
        terminal
            .draw(|frame| render(frame, Rect::new(0, 0, 2, 2), &view))
            .unwrap();
    }
}
