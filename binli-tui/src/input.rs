use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    None,
    Quit,
    /// Refetch all bins now; reconnects the change feed if it dropped
    Refresh,
    /// Send one simulated sensor reading per bin
    SimulateTick,
    /// Report the selected bin as emptied
    EmptySelected,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{Char, Down, Left, Right, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == KeyCode::Esc || (key.code == Char('q') && key.modifiers.is_empty()) {
        return Action::Quit;
    }

    match key.code {
        Up | Left | Char('k') => {
            app.select_previous();
            Action::None
        }
        Down | Right | Char('j') => {
            app.select_next();
            Action::None
        }
        Char('r') => Action::Refresh,
        Char('s') => Action::SimulateTick,
        Char('e') => Action::EmptySelected,
        _ => Action::None,
    }
}
