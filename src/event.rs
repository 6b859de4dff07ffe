use std::path::PathBuf;

use crate::message::{Message, RawMessage};

/// Operator intents, independent of how they are bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FetchOne,
    FetchNext10,
    FetchNext20,
    ToggleDelete,
    TogglePersist,
    ToggleSkip,
    TogglePoll,
    OpenSearch,
    SearchInput(char),
    SearchBackspace,
    SubmitSearch,
    CancelSearch,
    ToggleFilter,
    Reset,
    OpenHelp,
    SelectPrev,
    SelectNext,
    MaximizeDetail,
    SwitchPane,
    ScrollUp,
    ScrollDown,
    HalfPageUp,
    HalfPageDown,
    Quit,
}

/// One decoded receive, with the raw messages kept for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedBatch {
    pub messages: Vec<Message>,
    pub raw: Vec<RawMessage>,
}

/// Everything the session reacts to: operator input, terminal changes, and
/// the results of commands it dispatched earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Action(Action),
    Resize {
        width: u16,
        height: u16,
    },
    MessagesFetched {
        generation: u64,
        result: Result<FetchedBatch, String>,
    },
    MessagesDeleted {
        count: usize,
        result: Result<(), String>,
    },
    /// `count` is -1 whenever `error` is set.
    CountFetched {
        count: i64,
        error: Option<String>,
    },
    MessagePersisted(Result<PathBuf, String>),
    CountTick {
        epoch: u64,
    },
    HideHelp,
}
