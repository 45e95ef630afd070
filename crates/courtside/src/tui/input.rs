// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (scrolling, quit
// confirmation).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;
use crate::protocol::UserCommand;
use crate::session::WidgetPhase;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press goes to the orchestrator,
/// `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // crossterm reports Press and Release separately on some platforms.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    let widget_open = view_state.widget.phase != WidgetPhase::Closed;
    match key_event.code {
        KeyCode::Char('p') | KeyCode::Enter => {
            if widget_open {
                Some(UserCommand::CloseWidget)
            } else {
                Some(UserCommand::OpenWidget)
            }
        }
        KeyCode::Esc | KeyCode::Char('x') => widget_open.then_some(UserCommand::CloseWidget),

        KeyCode::Right | KeyCode::Char('l') => Some(UserCommand::NextMatch),
        KeyCode::Left | KeyCode::Char('h') => Some(UserCommand::PreviousMatch),

        KeyCode::Char('a') => Some(UserCommand::ToggleAutoRefresh),
        KeyCode::Char('s') => Some(UserCommand::ToggleSound),
        KeyCode::Char('r') => Some(UserCommand::Refresh),

        KeyCode::Up | KeyCode::Char('k') => {
            view_state.scroll_offset = view_state.scroll_offset.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            let last = view_state.dashboard.rows.len().saturating_sub(1);
            view_state.scroll_offset = (view_state.scroll_offset + 1).min(last);
            None
        }

        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// `y`/`q` confirm, `n`/Esc cancel, everything else is swallowed.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DashboardRow, DashboardView};
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl_key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn open_state() -> ViewState {
        let mut state = ViewState::default();
        state.widget.phase = WidgetPhase::Displaying { selected: 0 };
        state
    }

    #[test]
    fn p_opens_closed_widget() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(key(KeyCode::Char('p')), &mut state),
            Some(UserCommand::OpenWidget)
        );
    }

    #[test]
    fn p_closes_open_widget() {
        let mut state = open_state();
        assert_eq!(
            handle_key(key(KeyCode::Char('p')), &mut state),
            Some(UserCommand::CloseWidget)
        );
    }

    #[test]
    fn esc_closes_only_when_open() {
        let mut closed = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Esc), &mut closed), None);
        let mut open = open_state();
        assert_eq!(
            handle_key(key(KeyCode::Esc), &mut open),
            Some(UserCommand::CloseWidget)
        );
    }

    #[test]
    fn arrows_page_between_matches() {
        let mut state = open_state();
        assert_eq!(
            handle_key(key(KeyCode::Right), &mut state),
            Some(UserCommand::NextMatch)
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('h')), &mut state),
            Some(UserCommand::PreviousMatch)
        );
    }

    #[test]
    fn toggles_and_refresh() {
        let mut state = open_state();
        assert_eq!(
            handle_key(key(KeyCode::Char('a')), &mut state),
            Some(UserCommand::ToggleAutoRefresh)
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('s')), &mut state),
            Some(UserCommand::ToggleSound)
        );
        assert_eq!(
            handle_key(key(KeyCode::Char('r')), &mut state),
            Some(UserCommand::Refresh)
        );
    }

    #[test]
    fn scroll_stays_within_rows() {
        let mut state = ViewState::default();
        let row = DashboardRow {
            when: "Wed 15:00".into(),
            status: "LIVE".into(),
            players: "A v B".into(),
            score: "1-0".into(),
            tournament: String::new(),
        };
        state.dashboard = DashboardView {
            window: Some("Today".into()),
            rows: vec![row.clone(), row],
            offline: false,
        };

        handle_key(key(KeyCode::Up), &mut state);
        assert_eq!(state.scroll_offset, 0);
        handle_key(key(KeyCode::Down), &mut state);
        handle_key(key(KeyCode::Char('j')), &mut state);
        assert_eq!(state.scroll_offset, 1);
        handle_key(key(KeyCode::Char('k')), &mut state);
        assert_eq!(state.scroll_offset, 0);
    }

    #[test]
    fn q_asks_for_confirmation_then_quits() {
        let mut state = ViewState::default();
        assert_eq!(handle_key(key(KeyCode::Char('q')), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(
            handle_key(key(KeyCode::Char('y')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn confirmation_can_be_cancelled_and_blocks_other_keys() {
        let mut state = ViewState::default();
        handle_key(key(KeyCode::Char('q')), &mut state);
        assert_eq!(handle_key(key(KeyCode::Char('p')), &mut state), None);
        assert!(state.confirm_quit);
        assert_eq!(handle_key(key(KeyCode::Esc), &mut state), None);
        assert!(!state.confirm_quit);
    }

    #[test]
    fn ctrl_c_quits_even_during_confirmation() {
        let mut state = ViewState::default();
        assert_eq!(
            handle_key(ctrl_key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::Quit)
        );
        state.confirm_quit = true;
        assert_eq!(
            handle_key(ctrl_key(KeyCode::Char('c')), &mut state),
            Some(UserCommand::Quit)
        );
    }

    #[test]
    fn release_events_are_ignored() {
        let mut state = ViewState::default();
        let release = KeyEvent {
            code: KeyCode::Char('p'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(handle_key(release, &mut state), None);
    }
}
