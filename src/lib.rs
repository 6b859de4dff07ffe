//! Interactive browsing of message queues.
//!
//! The [`session::Session`] state machine is the core: it turns operator
//! actions and command results into session state plus new commands.
//! Everything with side effects lives behind [`command::Dispatcher`] and the
//! [`queue::QueueClient`] trait.

pub mod command;
pub mod config;
pub mod event;
pub mod filter;
pub mod keymap;
pub mod message;
pub mod queue;
pub mod render;
pub mod session;
pub mod sqs;

pub use command::{Command, Dispatcher};
pub use config::{Behaviours, QueueConfig, SessionTimings};
pub use event::{Action, Event, FetchedBatch};
pub use message::{Message, MessageFormat, RawMessage, TransformError, transform};
pub use session::{Session, ViewState};
