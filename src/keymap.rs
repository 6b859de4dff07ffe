use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::event::Action;
use crate::session::ViewState;

/// Maps a key press to an [`Action`] for the view that currently has focus.
pub fn action_for_key(view: ViewState, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if view == ViewState::ContextualSearchPrompt {
        return match key.code {
            KeyCode::Esc => Some(Action::CancelSearch),
            KeyCode::Char('c') if ctrl => Some(Action::CancelSearch),
            KeyCode::Enter => Some(Action::SubmitSearch),
            KeyCode::Backspace => Some(Action::SearchBackspace),
            KeyCode::Char(ch) if !ctrl => Some(Action::SearchInput(ch)),
            _ => None,
        };
    }

    if ctrl {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            KeyCode::Char('p') => Some(Action::TogglePoll),
            KeyCode::Char('s') => Some(Action::OpenSearch),
            KeyCode::Char('f') => Some(Action::ToggleFilter),
            KeyCode::Char('r') => Some(Action::Reset),
            KeyCode::Char('d') => Some(Action::HalfPageDown),
            KeyCode::Char('u') => Some(Action::HalfPageUp),
            _ => None,
        };
    }

    let common = match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('n') | KeyCode::Char(' ') => Some(Action::FetchOne),
        KeyCode::Char('N') => Some(Action::FetchNext10),
        KeyCode::Char('}') => Some(Action::FetchNext20),
        KeyCode::Char('?') => Some(Action::OpenHelp),
        KeyCode::Char('d') => Some(Action::ToggleDelete),
        KeyCode::Char('p') => Some(Action::TogglePersist),
        KeyCode::Char('s') => Some(Action::ToggleSkip),
        KeyCode::Char('1') => Some(Action::MaximizeDetail),
        KeyCode::Tab | KeyCode::BackTab => Some(Action::SwitchPane),
        _ => None,
    };
    if common.is_some() {
        return common;
    }

    match view {
        ViewState::MessageList => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectPrev),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectNext),
            _ => None,
        },
        ViewState::MessageDetail => match key.code {
            KeyCode::Char('[') | KeyCode::Char('h') | KeyCode::Left => Some(Action::SelectPrev),
            KeyCode::Char(']') | KeyCode::Char('l') | KeyCode::Right => Some(Action::SelectNext),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::ScrollUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::ScrollDown),
            KeyCode::Esc => Some(Action::Quit),
            _ => None,
        },
        ViewState::Help => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::ScrollUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::ScrollDown),
            KeyCode::Esc => Some(Action::Quit),
            _ => None,
        },
        ViewState::ContextualSearchPrompt => None,
    }
}
