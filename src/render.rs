use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::message::Message;
use crate::session::{Session, ViewState};

const LIST_WIDTH: u16 = 64;
const LABEL_WIDTH: usize = 12;
const ERROR_TRIM: usize = 120;

pub const HELP_TEXT: &str = "\
queue-lens has 3 views:
  - Message List View
  - Message Value View
  - Help View (this one)

General
  <tab>/<s-tab>      Switch focus between the list and the value pane
  1                  Maximize message value view
  ?                  Show help view
  <ctrl+p>           Toggle queue message count polling ON/OFF; ON by default
  n/<space>          Fetch the next message from the queue
  N                  Fetch up to 10 more messages from the queue
  }                  Fetch up to 100 more messages from the queue
  q/<ctrl+c>         Go back, or quit from the list view

Message List View
  k/<Up>             Move cursor up
  j/<Down>           Move cursor down
  d                  Toggle deletion mode; messages are deleted after being read
  p                  Toggle persist mode; messages are written to
                       <persist_dir>/<queue-name>/<session-start>/<unix-epoch>-<message-id>.<ext>
  s                  Toggle skipping mode; messages are consumed but not listed
  <ctrl+s>           Open the contextual search prompt
  <ctrl+f>           Toggle contextual filtering ON/OFF
  <ctrl+r>           Clear the message list

Message Value View
  [/h                Show the previous message in the list
  ]/l                Show the next message in the list
  j/k                Scroll
  <ctrl+d>/<ctrl+u>  Scroll by half a page
  q/<esc>            Minimize, or return focus to the list view

Contextual Search Prompt
  <enter>            Filter on a comma-separated list of context values
  <esc>              Cancel and turn filtering off
";

/// Draws the whole screen from a read-only view of the session.
pub fn draw(frame: &mut Frame, session: &Session) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    match session.active_view() {
        ViewState::Help => render_help(frame, root[0], session),
        ViewState::MessageDetail if session.detail_maximized() => {
            render_value(frame, root[0], session)
        }
        _ => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(LIST_WIDTH), Constraint::Min(10)])
                .split(root[0]);
            render_messages(frame, panes[0], session);
            render_value(frame, panes[1], session);
        }
    }

    render_status_bar(frame, root[1], session);
    render_footer(frame, root[2], session);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_messages(frame: &mut Frame, area: Rect, session: &Session) {
    let context_key = session.config().context_key.as_deref();
    let items: Vec<ListItem> = session
        .messages()
        .iter()
        .map(|message| message_item(message, context_key))
        .collect();

    let mut state = ListState::default();
    if !session.messages().is_empty() {
        state.select(Some(session.selected_index()));
    }

    let title = match session.queue_count() {
        Some(count) => format!("Messages ({count} in queue)"),
        None => String::from("Messages"),
    };
    let focused = matches!(
        session.active_view(),
        ViewState::MessageList | ViewState::ContextualSearchPrompt
    );

    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(focused)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("│ ");

    frame.render_stateful_widget(list, area, &mut state);
}

fn message_item(message: &Message, context_key: Option<&str>) -> ListItem<'static> {
    let id = if message.id.is_empty() {
        "<missing>"
    } else {
        message.id.as_str()
    };
    let mut lines = vec![Line::from(format!("{}: {id}", pad("msgId")))];

    match (&message.error, context_key, message.context_value.as_deref()) {
        (Some(_), _, _) => lines.push(Line::from(Span::styled(
            format!("{}: decode failed", pad("error")),
            Style::default().fg(Color::Red),
        ))),
        (None, Some(key), Some(value)) => {
            lines.push(Line::from(Span::styled(
                format!("{}: {value}", pad(key)),
                Style::default().fg(Color::DarkGray),
            )));
        }
        _ => {}
    }
    lines.push(Line::from(String::new()));
    ListItem::new(lines)
}

fn render_value(frame: &mut Frame, area: Rect, session: &Session) {
    let lines: Vec<Line> = match session.selected_message() {
        Some(message) if message.error.is_some() => message
            .value_text()
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Red))))
            .collect(),
        Some(message) => message
            .body
            .lines()
            .map(|line| Line::from(line.to_string()))
            .collect(),
        None => vec![Line::from(Span::styled(
            "No message selected; press n to fetch one",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let block = Block::default()
        .title("Message Value")
        .borders(Borders::ALL)
        .border_style(focus_style(session.active_view() == ViewState::MessageDetail));
    let para = Paragraph::new(lines)
        .block(block)
        .scroll((session.detail_scroll(), 0))
        .wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

fn render_help(frame: &mut Frame, area: Rect, session: &Session) {
    let lines: Vec<Line> = HELP_TEXT
        .lines()
        .map(|line| {
            if !line.is_empty() && !line.starts_with(' ') {
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Yellow)))
            }
        })
        .collect();

    let para = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(focus_style(true)),
        )
        .scroll((session.help_scroll(), 0));
    frame.render_widget(para, area);
}

fn render_status_bar(frame: &mut Frame, area: Rect, session: &Session) {
    let line = if session.active_view() == ViewState::ContextualSearchPrompt {
        let key = session.config().context_key.as_deref().unwrap_or("context");
        Line::from(vec![
            Span::styled(
                format!("Filter messages where {key} in > "),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(session.search_input().to_string()),
        ])
    } else {
        Line::from(session.status().map(|s| trim(s, ERROR_TRIM)).unwrap_or_default())
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(frame: &mut Frame, area: Rect, session: &Session) {
    let behaviours = session.behaviours();
    let mut spans = vec![Span::styled(
        " queue-lens ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];

    if session.show_help_hint() {
        spans.push(Span::styled(
            " Press ? for help",
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ));
    }

    let deleting = if behaviours.delete_after_read {
        " deleting msgs!"
    } else {
        " not deleting msgs!"
    };
    spans.push(Span::styled(
        deleting,
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    ));
    if !behaviours.poll_message_count {
        spans.push(Span::styled(
            " not polling for msg count!",
            Style::default().fg(Color::Gray),
        ));
    }
    if behaviours.persist_to_disk {
        spans.push(Span::styled(
            " persisting msgs!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    if behaviours.skip_population {
        spans.push(Span::styled(
            " skipping msgs!",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }
    if behaviours.filter_active && !session.allow_set().is_empty() {
        if let Some(key) = session.config().context_key.as_deref() {
            let values: Vec<&str> = session.allow_set().iter().map(String::as_str).collect();
            spans.push(Span::styled(
                format!(" filtering where {key} in : [{}]", values.join(", ")),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
        }
    }
    if let Some(err) = session.pending_error() {
        spans.push(Span::styled(
            format!(" error: {}", trim(err, ERROR_TRIM)),
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray)),
        area,
    );
}

fn pad(label: &str) -> String {
    let trimmed = trim(label, LABEL_WIDTH);
    format!("{trimmed:<LABEL_WIDTH$}")
}

fn trim(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
