use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    CycleNamespace,
    ToggleIssues,
    StartSearch,
    SortCpu,
    SortMemory,
    ViewLogs,
    OpenShell,
    Diagnose,
    ViewManifest,
    Restart,
    Delete,
    Cleanse,
    TogglePortForward,
    Submit,
    Cancel,
    Backspace,
    InputChar(char),
    ConfirmYes,
    ConfirmNo,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if is_ctrl_c(key) {
        return Some(Action::Quit);
    }

    match mode {
        InputMode::List => map_list_key(key),
        InputMode::Search => map_search_key(key),
        InputMode::Picker => map_picker_key(key),
        InputMode::Confirm => map_confirm_key(key),
        InputMode::Viewer => map_viewer_key(key),
    }
}

fn is_ctrl_c(key: KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

fn map_list_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Action::Bottom),
        KeyCode::Char('n') => Some(Action::CycleNamespace),
        KeyCode::Tab => Some(Action::ToggleIssues),
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('c') => Some(Action::SortCpu),
        KeyCode::Char('m') => Some(Action::SortMemory),
        KeyCode::Enter => Some(Action::ViewLogs),
        KeyCode::Char('s') => Some(Action::OpenShell),
        KeyCode::Char('?') => Some(Action::Diagnose),
        KeyCode::Char('y') => Some(Action::ViewManifest),
        KeyCode::Char('r') => Some(Action::Restart),
        KeyCode::Char('d') => Some(Action::Delete),
        KeyCode::Char('C') => Some(Action::Cleanse),
        KeyCode::Char('f') => Some(Action::TogglePortForward),
        _ => None,
    }
}

fn map_search_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_picker_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Cancel),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::Enter => Some(Action::Submit),
        _ => None,
    }
}

fn map_confirm_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
            Some(Action::ConfirmNo)
        }
        _ => None,
    }
}

fn map_viewer_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Action::Cancel),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(Action::PageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::Top),
        KeyCode::End | KeyCode::Char('G') => Some(Action::Bottom),
        _ => None,
    }
}
