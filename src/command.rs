//! Side effects requested by the session, and the runtime that executes them.
//!
//! A [`Command`] is a plain description. [`Dispatcher::dispatch`] runs each
//! one on its own tokio task; the task reports back with exactly one
//! [`Event`] on the session's inbound channel. Nothing here touches session
//! state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::config::QueueConfig;
use crate::event::{Event, FetchedBatch};
use crate::message::{MessageFormat, RawMessage};
use crate::queue::{MAX_RECEIVE_BATCH, QueueClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchMessages {
        max_messages: i32,
        wait_seconds: i32,
        generation: u64,
    },
    DeleteMessages {
        messages: Vec<RawMessage>,
    },
    GetApproxCount,
    PersistToDisk {
        id: String,
        value: String,
        format: MessageFormat,
        dir: PathBuf,
    },
    TickCount {
        interval: Duration,
        epoch: u64,
    },
    HideHelpAfter(Duration),
}

pub struct Dispatcher {
    client: Arc<dyn QueueClient>,
    config: Arc<QueueConfig>,
    events: UnboundedSender<Event>,
    runtime: Handle,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn QueueClient>,
        config: Arc<QueueConfig>,
        events: UnboundedSender<Event>,
        runtime: Handle,
    ) -> Self {
        Self {
            client,
            config,
            events,
            runtime,
        }
    }

    pub fn dispatch(&self, command: Command) {
        let client = Arc::clone(&self.client);
        let config = Arc::clone(&self.config);
        let events = self.events.clone();
        debug!(?command, "dispatching");

        self.runtime.spawn(async move {
            let event = execute(command, client.as_ref(), &config).await;
            if events.send(event).is_err() {
                debug!("event loop has shut down; dropping result");
            }
        });
    }

    pub fn dispatch_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.dispatch(command);
        }
    }
}

/// Runs one command to completion and returns its result event.
pub async fn execute(command: Command, client: &dyn QueueClient, config: &QueueConfig) -> Event {
    match command {
        Command::FetchMessages {
            max_messages,
            wait_seconds,
            generation,
        } => Event::MessagesFetched {
            generation,
            result: fetch_messages(client, config, max_messages, wait_seconds).await,
        },
        Command::DeleteMessages { messages } => {
            let count = messages.len();
            Event::MessagesDeleted {
                count,
                result: delete_messages(client, &messages).await,
            }
        }
        Command::GetApproxCount => match client.approximate_count().await {
            Ok(count) => Event::CountFetched { count, error: None },
            Err(err) => Event::CountFetched {
                count: -1,
                error: Some(err.to_string()),
            },
        },
        Command::PersistToDisk {
            id,
            value,
            format,
            dir,
        } => {
            let written =
                tokio::task::spawn_blocking(move || persist_message(&id, &value, format, &dir))
                    .await;
            let result = match written {
                Ok(Ok(path)) => Ok(path),
                Ok(Err(err)) => Err(format!("{err:#}")),
                Err(err) => Err(format!("persist task failed: {err}")),
            };
            Event::MessagePersisted(result)
        }
        Command::TickCount { interval, epoch } => {
            tokio::time::sleep(interval).await;
            Event::CountTick { epoch }
        }
        Command::HideHelpAfter(after) => {
            tokio::time::sleep(after).await;
            Event::HideHelp
        }
    }
}

async fn fetch_messages(
    client: &dyn QueueClient,
    config: &QueueConfig,
    max_messages: i32,
    wait_seconds: i32,
) -> Result<FetchedBatch, String> {
    let raw = client
        .receive(max_messages.clamp(1, MAX_RECEIVE_BATCH), wait_seconds.max(0))
        .await
        .map_err(|err| err.to_string())?;
    let messages = raw.iter().map(|message| message.decode(config)).collect();
    debug!(received = raw.len(), "fetched messages");
    Ok(FetchedBatch { messages, raw })
}

async fn delete_messages(client: &dyn QueueClient, messages: &[RawMessage]) -> Result<(), String> {
    let handles: Vec<String> = messages
        .iter()
        .filter_map(|message| message.receipt_handle.clone())
        .collect();
    if handles.len() < messages.len() {
        warn!(
            without_handle = messages.len() - handles.len(),
            "some messages have no receipt handle and can't be deleted"
        );
    }
    if handles.is_empty() {
        return Ok(());
    }

    client
        .delete_batch(handles)
        .await
        .map_err(|err| err.to_string())
}

/// Writes one message value to `{dir}/{unix_timestamp}-{id}.{ext}`.
///
/// File names only stay unique while ids are unique within a second.
pub fn persist_message(id: &str, value: &str, format: MessageFormat, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let file_name = format!("{}-{}.{}", Utc::now().timestamp(), id, format.extension());
    let path = dir.join(file_name);
    fs::write(&path, value).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(path)
}
