//! Input handling and keybindings.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::state::DashboardState;

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// No action, continue.
    None,
    /// Quit the application.
    Quit,
    /// Run a collection cycle now.
    Refresh,
}

/// Handles key input and updates state.
pub fn handle_key(state: &mut DashboardState, key: KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }
    if state.show_help {
        return handle_help(state, key);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Quit,
        KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Refresh,
        KeyCode::Char('s') | KeyCode::Char('S') => {
            state.cycle_node_sort();
            KeyAction::None
        }
        KeyCode::Char('p') | KeyCode::Char('P') => {
            state.cycle_pod_sort();
            KeyAction::None
        }
        KeyCode::Char('f') | KeyCode::Char('F') | KeyCode::Char('n') | KeyCode::Char('N') => {
            state.cycle_namespace();
            KeyAction::None
        }
        KeyCode::Esc => {
            state.clear_namespace();
            KeyAction::None
        }
        KeyCode::Char('t') | KeyCode::Char('T') => {
            state.cycle_view();
            KeyAction::None
        }
        KeyCode::Char('a') | KeyCode::Char('A') => {
            state.toggle_system();
            KeyAction::None
        }
        KeyCode::Tab => {
            state.toggle_focus();
            KeyAction::None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.select_up();
            KeyAction::None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.select_down();
            KeyAction::None
        }
        KeyCode::Char('?') => {
            state.show_help = true;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

/// The help popup swallows everything except its close keys.
fn handle_help(state: &mut DashboardState, key: KeyEvent) -> KeyAction {
    if matches!(
        key.code,
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Char('Q')
    ) {
        state.show_help = false;
    }
    KeyAction::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::state::tests::populated;
    use crate::tui::state::Focus;
    use ktop_lib::query::{PodSortField, ViewMode};

    fn press(state: &mut DashboardState, code: KeyCode) -> KeyAction {
        handle_key(state, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_quit_and_refresh() {
        let mut state = populated();
        assert_eq!(press(&mut state, KeyCode::Char('q')), KeyAction::Quit);
        assert_eq!(press(&mut state, KeyCode::Char('r')), KeyAction::Refresh);
        assert_eq!(
            handle_key(
                &mut state,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            KeyAction::Quit
        );
    }

    #[test]
    fn test_state_keys() {
        let mut state = populated();

        press(&mut state, KeyCode::Char('p'));
        assert_eq!(state.pod_order.field, PodSortField::Memory);

        press(&mut state, KeyCode::Char('f'));
        assert_eq!(state.namespace, "default");
        press(&mut state, KeyCode::Char('n'));
        assert_eq!(state.namespace, "kube-system");
        press(&mut state, KeyCode::Esc);
        assert!(state.namespace.is_empty());

        press(&mut state, KeyCode::Char('a'));
        assert!(state.show_system);

        press(&mut state, KeyCode::Tab);
        assert_eq!(state.focus, Focus::Pods);

        press(&mut state, KeyCode::Char('t'));
        assert_eq!(state.view, ViewMode::Nodes);
    }

    #[test]
    fn test_help_popup_swallows_keys() {
        let mut state = populated();
        press(&mut state, KeyCode::Char('?'));
        assert!(state.show_help);

        assert_eq!(press(&mut state, KeyCode::Char('q')), KeyAction::None);
        assert!(!state.show_help);

        press(&mut state, KeyCode::Char('?'));
        press(&mut state, KeyCode::Char('t'));
        assert_eq!(state.view, ViewMode::Split);
        press(&mut state, KeyCode::Esc);
        assert!(!state.show_help);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut state = populated();
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(handle_key(&mut state, key), KeyAction::None);
    }
}
