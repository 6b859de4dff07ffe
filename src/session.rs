//! The interactive session engine.
//!
//! [`Session`] owns all session state and is the only thing that mutates it.
//! [`Session::update`] consumes one [`Event`] and returns the [`Command`]s the
//! runtime should start next; it performs no I/O itself. Command results come
//! back later as events, in whatever order they complete.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::command::Command;
use crate::config::{Behaviours, QueueConfig, SessionTimings};
use crate::event::{Action, Event, FetchedBatch};
use crate::filter::{parse_allow_set, should_display};
use crate::message::Message;

pub const FETCHING_INDICATOR: &str = "fetching ...";
const SEARCH_CHAR_LIMIT: usize = 100;
const HALF_PAGE_FALLBACK: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    MessageList,
    MessageDetail,
    Help,
    ContextualSearchPrompt,
}

pub struct Session {
    config: QueueConfig,
    behaviours: Behaviours,
    timings: SessionTimings,
    persist_dir: PathBuf,
    active_view: ViewState,
    last_view: ViewState,
    messages: Vec<Message>,
    index_by_id: HashMap<String, usize>,
    selected_index: usize,
    allow_set: BTreeSet<String>,
    search_input: String,
    detail_maximized: bool,
    detail_scroll: u16,
    help_scroll: u16,
    show_help_hint: bool,
    queue_count: Option<i64>,
    status: Option<String>,
    pending_error: Option<String>,
    terminal_size: (u16, u16),
    // Bumped on reset; fetches from an older generation are not displayed.
    generation: u64,
    // Bumped whenever polling is switched on; only the newest tick chain re-arms.
    poll_epoch: u64,
    quit: bool,
}

impl Session {
    pub fn new(
        config: QueueConfig,
        behaviours: Behaviours,
        persist_dir: PathBuf,
        timings: SessionTimings,
    ) -> Self {
        Self {
            config,
            behaviours,
            timings,
            persist_dir,
            active_view: ViewState::MessageList,
            last_view: ViewState::MessageList,
            messages: Vec::new(),
            index_by_id: HashMap::new(),
            selected_index: 0,
            allow_set: BTreeSet::new(),
            search_input: String::new(),
            detail_maximized: false,
            detail_scroll: 0,
            help_scroll: 0,
            show_help_hint: true,
            queue_count: None,
            status: None,
            pending_error: None,
            terminal_size: (0, 0),
            generation: 0,
            poll_epoch: 0,
            quit: false,
        }
    }

    /// Commands to start once, before the first event is processed.
    pub fn init(&self) -> Vec<Command> {
        let mut commands = vec![Command::GetApproxCount];
        if self.behaviours.poll_message_count {
            commands.push(Command::TickCount {
                interval: self.timings.count_poll_interval,
                epoch: self.poll_epoch,
            });
        }
        commands.push(Command::HideHelpAfter(self.timings.hide_help_after));
        commands
    }

    pub fn update(&mut self, event: Event) -> Vec<Command> {
        self.status = None;
        self.pending_error = None;

        match event {
            Event::Action(action) => self.on_action(action),
            Event::Resize { width, height } => {
                self.terminal_size = (width, height);
                Vec::new()
            }
            Event::MessagesFetched { generation, result } => match result {
                Ok(batch) => self.on_messages_fetched(generation, batch),
                Err(err) => {
                    self.pending_error = Some(err);
                    Vec::new()
                }
            },
            Event::MessagesDeleted { count, result } => {
                match result {
                    Ok(()) => debug!(count, "messages deleted"),
                    Err(err) => self.pending_error = Some(err),
                }
                Vec::new()
            }
            Event::CountFetched { count, error } => {
                match error {
                    Some(err) => self.pending_error = Some(err),
                    None => self.queue_count = Some(count),
                }
                Vec::new()
            }
            Event::MessagePersisted(result) => {
                match result {
                    Ok(path) => self.status = Some(format!("saved to {}", path.display())),
                    Err(err) => self.pending_error = Some(err),
                }
                Vec::new()
            }
            Event::CountTick { epoch } => self.on_count_tick(epoch),
            Event::HideHelp => {
                self.show_help_hint = false;
                Vec::new()
            }
        }
    }

    fn on_action(&mut self, action: Action) -> Vec<Command> {
        if self.active_view == ViewState::ContextualSearchPrompt {
            match action {
                Action::SearchInput(ch) => {
                    if self.search_input.chars().count() < SEARCH_CHAR_LIMIT {
                        self.search_input.push(ch);
                    }
                }
                Action::SearchBackspace => {
                    self.search_input.pop();
                }
                Action::SubmitSearch => self.submit_search(),
                Action::CancelSearch | Action::Quit => self.cancel_search(),
                _ => {}
            }
            return Vec::new();
        }

        match action {
            Action::FetchOne => self.fetch(1, 1),
            Action::FetchNext10 => self.fetch(10, 1),
            Action::FetchNext20 => self.fetch(20, 5),
            Action::ToggleDelete => {
                if self.active_view == ViewState::MessageList {
                    self.behaviours.delete_after_read = !self.behaviours.delete_after_read;
                }
                Vec::new()
            }
            Action::TogglePersist => {
                if self.active_view == ViewState::MessageList {
                    self.behaviours.persist_to_disk = !self.behaviours.persist_to_disk;
                }
                Vec::new()
            }
            Action::ToggleSkip => {
                if self.active_view == ViewState::MessageList {
                    self.behaviours.skip_population = !self.behaviours.skip_population;
                }
                Vec::new()
            }
            Action::TogglePoll => self.toggle_poll(),
            Action::OpenSearch => {
                self.open_search();
                Vec::new()
            }
            Action::ToggleFilter => {
                if !self.allow_set.is_empty() {
                    self.behaviours.filter_active = !self.behaviours.filter_active;
                }
                Vec::new()
            }
            Action::Reset => {
                if self.active_view == ViewState::MessageList {
                    self.reset();
                }
                Vec::new()
            }
            Action::OpenHelp => {
                if self.active_view != ViewState::Help {
                    self.last_view = self.active_view;
                    self.active_view = ViewState::Help;
                    self.help_scroll = 0;
                }
                Vec::new()
            }
            Action::SelectPrev => {
                if matches!(self.active_view, ViewState::MessageList | ViewState::MessageDetail) {
                    self.select(self.selected_index.saturating_sub(1));
                }
                Vec::new()
            }
            Action::SelectNext => {
                if matches!(self.active_view, ViewState::MessageList | ViewState::MessageDetail) {
                    self.select(self.selected_index.saturating_add(1));
                }
                Vec::new()
            }
            Action::MaximizeDetail => {
                if self.active_view != ViewState::Help {
                    self.detail_maximized = true;
                    self.last_view = ViewState::MessageList;
                    self.active_view = ViewState::MessageDetail;
                }
                Vec::new()
            }
            Action::SwitchPane => {
                if !self.detail_maximized {
                    self.active_view = match self.active_view {
                        ViewState::MessageList => ViewState::MessageDetail,
                        ViewState::MessageDetail => ViewState::MessageList,
                        other => other,
                    };
                }
                Vec::new()
            }
            Action::ScrollUp => {
                self.scroll(|offset, _| offset.saturating_sub(1));
                Vec::new()
            }
            Action::ScrollDown => {
                self.scroll(|offset, _| offset.saturating_add(1));
                Vec::new()
            }
            Action::HalfPageUp => {
                self.scroll(|offset, half| offset.saturating_sub(half));
                Vec::new()
            }
            Action::HalfPageDown => {
                self.scroll(|offset, half| offset.saturating_add(half));
                Vec::new()
            }
            Action::Quit => {
                self.quit_view();
                Vec::new()
            }
            // Only meaningful inside the search prompt.
            Action::SearchInput(_)
            | Action::SearchBackspace
            | Action::SubmitSearch
            | Action::CancelSearch => Vec::new(),
        }
    }

    fn fetch(&mut self, requests: usize, per_request: i32) -> Vec<Command> {
        self.status = Some(FETCHING_INDICATOR.to_string());
        (0..requests)
            .map(|_| Command::FetchMessages {
                max_messages: per_request,
                wait_seconds: self.timings.receive_wait_secs,
                generation: self.generation,
            })
            .collect()
    }

    fn on_messages_fetched(&mut self, generation: u64, batch: FetchedBatch) -> Vec<Command> {
        let FetchedBatch { messages, raw } = batch;
        let mut commands = Vec::new();

        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                dropped = messages.len(),
                "discarding fetch from before reset"
            );
        } else if self.behaviours.skip_population {
            debug!(skipped = messages.len(), "skipping fetched messages");
        } else {
            for message in messages {
                if !should_display(&message, self.behaviours.filter_active, &self.allow_set) {
                    debug!(id = %message.id, "message filtered out");
                    continue;
                }
                if self.behaviours.persist_to_disk && message.error.is_none() {
                    commands.push(Command::PersistToDisk {
                        id: message.id.clone(),
                        value: message.body.clone(),
                        format: self.config.format,
                        dir: self.persist_dir.clone(),
                    });
                }
                self.push_message(message);
            }
        }

        // Consumption doesn't depend on display: every received message is acknowledged.
        if self.behaviours.delete_after_read && !raw.is_empty() {
            commands.push(Command::DeleteMessages { messages: raw });
        }
        commands
    }

    fn push_message(&mut self, message: Message) {
        let idx = self.messages.len();
        if !message.id.is_empty() {
            self.index_by_id.insert(message.id.clone(), idx);
        }
        self.messages.push(message);
    }

    fn on_count_tick(&mut self, epoch: u64) -> Vec<Command> {
        if !self.behaviours.poll_message_count || epoch != self.poll_epoch {
            debug!(epoch, current = self.poll_epoch, "count tick chain ended");
            return Vec::new();
        }
        vec![
            Command::GetApproxCount,
            Command::TickCount {
                interval: self.timings.count_poll_interval,
                epoch,
            },
        ]
    }

    fn toggle_poll(&mut self) -> Vec<Command> {
        self.behaviours.poll_message_count = !self.behaviours.poll_message_count;
        if !self.behaviours.poll_message_count {
            return Vec::new();
        }

        self.poll_epoch = self.poll_epoch.wrapping_add(1);
        vec![
            Command::GetApproxCount,
            Command::TickCount {
                interval: self.timings.count_poll_interval,
                epoch: self.poll_epoch,
            },
        ]
    }

    fn open_search(&mut self) {
        if !matches!(self.active_view, ViewState::MessageList | ViewState::MessageDetail) {
            return;
        }
        if self.config.context_key.is_none() {
            self.pending_error =
                Some(String::from("contextual search needs a context key in the profile"));
            return;
        }
        self.last_view = self.active_view;
        self.active_view = ViewState::ContextualSearchPrompt;
    }

    fn submit_search(&mut self) {
        let input = std::mem::take(&mut self.search_input);
        self.active_view = self.last_view;

        if input.trim().is_empty() {
            self.behaviours.filter_active = false;
            return;
        }

        self.allow_set = parse_allow_set(&input);
        self.behaviours.filter_active = !self.allow_set.is_empty();
        info!(values = ?self.allow_set, "contextual filter set");
    }

    fn cancel_search(&mut self) {
        self.search_input.clear();
        self.behaviours.filter_active = false;
        self.active_view = self.last_view;
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.index_by_id.clear();
        self.selected_index = 0;
        self.detail_scroll = 0;
        self.behaviours.filter_active = false;
        self.generation = self.generation.wrapping_add(1);
        info!(generation = self.generation, "session list reset");
    }

    fn select(&mut self, idx: usize) {
        if self.messages.is_empty() {
            return;
        }
        let clamped = idx.min(self.messages.len() - 1);
        if clamped != self.selected_index {
            self.selected_index = clamped;
            self.detail_scroll = 0;
        }
    }

    fn scroll(&mut self, step: impl Fn(u16, u16) -> u16) {
        let half = match self.terminal_size.1 {
            0 => HALF_PAGE_FALLBACK,
            height => (height / 2).max(1),
        };
        match self.active_view {
            ViewState::MessageDetail => self.detail_scroll = step(self.detail_scroll, half),
            ViewState::Help => self.help_scroll = step(self.help_scroll, half),
            ViewState::MessageList | ViewState::ContextualSearchPrompt => {}
        }
    }

    fn quit_view(&mut self) {
        match self.active_view {
            ViewState::MessageList => self.quit = true,
            ViewState::MessageDetail => {
                if self.detail_maximized {
                    self.detail_maximized = false;
                } else {
                    self.active_view = ViewState::MessageList;
                }
            }
            ViewState::Help => self.active_view = self.last_view,
            ViewState::ContextualSearchPrompt => self.cancel_search(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn behaviours(&self) -> Behaviours {
        self.behaviours
    }

    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    pub fn active_view(&self) -> ViewState {
        self.active_view
    }

    pub fn last_view(&self) -> ViewState {
        self.last_view
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_by_id(&self, id: &str) -> Option<&Message> {
        self.index_by_id
            .get(id)
            .and_then(|idx| self.messages.get(*idx))
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn selected_message(&self) -> Option<&Message> {
        self.messages.get(self.selected_index)
    }

    pub fn allow_set(&self) -> &BTreeSet<String> {
        &self.allow_set
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn detail_maximized(&self) -> bool {
        self.detail_maximized
    }

    pub fn detail_scroll(&self) -> u16 {
        self.detail_scroll
    }

    pub fn help_scroll(&self) -> u16 {
        self.help_scroll
    }

    pub fn show_help_hint(&self) -> bool {
        self.show_help_hint
    }

    pub fn queue_count(&self) -> Option<i64> {
        self.queue_count
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_deref()
    }

    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}
