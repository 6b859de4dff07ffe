use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use queue_lens::event::Action;
use queue_lens::keymap::action_for_key;
use queue_lens::session::ViewState;

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(ch: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
}

#[test]
fn fetch_keys_work_everywhere_but_the_prompt() {
    for view in [ViewState::MessageList, ViewState::MessageDetail, ViewState::Help] {
        assert_eq!(action_for_key(view, key(KeyCode::Char('n'))), Some(Action::FetchOne));
        assert_eq!(action_for_key(view, key(KeyCode::Char('N'))), Some(Action::FetchNext10));
        assert_eq!(action_for_key(view, key(KeyCode::Char('}'))), Some(Action::FetchNext20));
    }
    assert_eq!(
        action_for_key(ViewState::ContextualSearchPrompt, key(KeyCode::Char('n'))),
        Some(Action::SearchInput('n'))
    );
}

#[test]
fn control_keys() {
    let view = ViewState::MessageList;
    assert_eq!(action_for_key(view, ctrl('c')), Some(Action::Quit));
    assert_eq!(action_for_key(view, ctrl('p')), Some(Action::TogglePoll));
    assert_eq!(action_for_key(view, ctrl('s')), Some(Action::OpenSearch));
    assert_eq!(action_for_key(view, ctrl('f')), Some(Action::ToggleFilter));
    assert_eq!(action_for_key(view, ctrl('r')), Some(Action::Reset));
    assert_eq!(action_for_key(view, ctrl('d')), Some(Action::HalfPageDown));
    assert_eq!(action_for_key(view, key(KeyCode::Char('d'))), Some(Action::ToggleDelete));
}

#[test]
fn arrows_select_in_list_and_scroll_in_detail() {
    assert_eq!(
        action_for_key(ViewState::MessageList, key(KeyCode::Down)),
        Some(Action::SelectNext)
    );
    assert_eq!(
        action_for_key(ViewState::MessageDetail, key(KeyCode::Down)),
        Some(Action::ScrollDown)
    );
    assert_eq!(
        action_for_key(ViewState::MessageDetail, key(KeyCode::Char(']'))),
        Some(Action::SelectNext)
    );
    assert_eq!(action_for_key(ViewState::MessageList, key(KeyCode::Esc)), None);
}

#[test]
fn prompt_keys() {
    let view = ViewState::ContextualSearchPrompt;
    assert_eq!(action_for_key(view, key(KeyCode::Enter)), Some(Action::SubmitSearch));
    assert_eq!(action_for_key(view, key(KeyCode::Esc)), Some(Action::CancelSearch));
    assert_eq!(action_for_key(view, ctrl('c')), Some(Action::CancelSearch));
    assert_eq!(action_for_key(view, key(KeyCode::Backspace)), Some(Action::SearchBackspace));
    assert_eq!(action_for_key(view, key(KeyCode::Char('q'))), Some(Action::SearchInput('q')));
}
