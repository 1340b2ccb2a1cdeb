//! Keyboard event handling for the TUI.
//!
//! Maps crossterm keyboard events to application state changes. Key
//! behavior depends on which panel has focus.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, Focus};

/// What the event loop should do after a key was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Send this question to the orchestration worker.
    Submit(String),
}

/// Handles a keyboard event and updates the app state accordingly.
///
/// # Event Handling
///
/// - `Ctrl+C`: quit from anywhere; `q` quits outside the input
/// - `Tab` / `Shift+Tab`: cycle focus
/// - `Esc`: return to the input
/// - Input focused: typing edits the question, `Enter` submits
/// - History focused: j/k select an earlier question
/// - Answer focused: j/k scroll
///
/// # Examples
///
/// ```
/// use cloudqa::tui::{App, event::{Action, handle_key_event}};
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
///
/// let mut app = App::new();
/// let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
/// assert_eq!(handle_key_event(&mut app, key), Action::Quit);
/// ```
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Tab => {
            app.next_focus();
            return Action::None;
        }
        KeyCode::BackTab => {
            app.prev_focus();
            return Action::None;
        }
        KeyCode::Esc => {
            app.reset_focus();
            return Action::None;
        }
        _ => {}
    }

    match app.focus() {
        Focus::Input => handle_input(app, key),
        Focus::History => {
            match key.code {
                KeyCode::Char('q') => return Action::Quit,
                KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
                KeyCode::Enter => app.next_focus(),
                _ => {}
            }
            Action::None
        }
        Focus::Answer => {
            match key.code {
                KeyCode::Char('q') => return Action::Quit,
                KeyCode::Char('j') | KeyCode::Down => app.scroll_answer_down(1),
                KeyCode::Char('k') | KeyCode::Up => app.scroll_answer_up(1),
                KeyCode::PageDown => app.scroll_answer_down(10),
                KeyCode::PageUp => app.scroll_answer_up(10),
                _ => {}
            }
            Action::None
        }
    }
}

fn handle_input(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char(c) if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT => {
            app.push_input_char(c);
        }
        KeyCode::Backspace => app.pop_input_char(),
        KeyCode::Enter => {
            if let Some(question) = app.take_question() {
                return Action::Submit(question);
            }
        }
        _ => {}
    }
    Action::None
}
