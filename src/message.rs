//! Decoding of raw queue messages into displayable [`Message`]s.
//!
//! [`transform`] is pure: the same raw id/body and configuration always
//! produce the same [`Message`], and nothing outside the return value is
//! touched.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::QueueConfig;

/// Encoding of message bodies on a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageFormat {
    #[default]
    Json,
    PlainText,
}

impl MessageFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Self::Json),
            "none" | "plaintext" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::PlainText => "none",
        }
    }

    /// File extension used when persisting a message of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::PlainText => "txt",
        }
    }
}

/// A message exactly as the queue handed it over.
///
/// The receipt handle is what deletion needs; ids alone are not enough.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawMessage {
    pub id: Option<String>,
    pub body: Option<String>,
    pub receipt_handle: Option<String>,
}

impl RawMessage {
    pub fn new(id: impl Into<String>, body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            body: Some(body.into()),
            receipt_handle: Some(receipt_handle.into()),
        }
    }

    pub fn decode(&self, config: &QueueConfig) -> Message {
        transform(self.id.as_deref(), self.body.as_deref(), config)
    }
}

/// Reasons a single message could not be decoded. Every variant names the
/// message id and carries the raw body so the operator can see what arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("message id is missing (body: {body})")]
    MissingId { body: String },

    #[error("message body is missing (id: {id})")]
    MissingBody { id: String },

    #[error("couldn't parse body as a JSON object: {reason} (id: {id}, body: {body})")]
    MalformedBody {
        id: String,
        body: String,
        reason: String,
    },

    #[error("context key {key:?} not found (id: {id}, body: {body})")]
    ContextKeyNotFound {
        id: String,
        body: String,
        key: String,
    },

    #[error("value for context key {key:?} is not a string: {value} (id: {id}, body: {body})")]
    ContextValueNotString {
        id: String,
        body: String,
        key: String,
        value: String,
    },

    #[error("subset key {key:?} not found (id: {id}, body: {body})")]
    SubsetKeyNotFound {
        id: String,
        body: String,
        key: String,
    },

    #[error(
        "value for subset key {key:?} is a {found}; expected an object or stringified JSON (id: {id}, body: {body})"
    )]
    SubsetTypeUnsupported {
        id: String,
        body: String,
        key: String,
        found: &'static str,
    },

    #[error("value for subset key {key:?} isn't a JSON object: {reason} (id: {id}, body: {body})")]
    SubsetUnparseable {
        id: String,
        body: String,
        key: String,
        reason: String,
    },
}

/// A decoded queue message, as shown in the message list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub id: String,
    pub body: String,
    pub context_key: Option<String>,
    pub context_value: Option<String>,
    pub error: Option<TransformError>,
}

impl Message {
    fn failed(id: String, error: TransformError) -> Self {
        Self {
            id,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Text for the value pane: the body, or the decode error in its place.
    pub fn value_text(&self) -> String {
        match &self.error {
            Some(err) => format!("error: {err}"),
            None => self.body.clone(),
        }
    }
}

struct Decoded {
    body: String,
    context_value: Option<String>,
}

pub fn transform(id: Option<&str>, body: Option<&str>, config: &QueueConfig) -> Message {
    let Some(id) = id else {
        return Message::failed(
            String::new(),
            TransformError::MissingId {
                body: body.unwrap_or("<none>").to_string(),
            },
        );
    };
    let Some(body) = body else {
        return Message::failed(
            String::new(),
            TransformError::MissingBody { id: id.to_string() },
        );
    };

    let decoded = match config.format {
        MessageFormat::PlainText => Ok(Decoded {
            body: body.to_string(),
            context_value: None,
        }),
        MessageFormat::Json => decode_json(
            id,
            body,
            config.subset_key.as_deref(),
            config.context_key.as_deref(),
        ),
    };

    match decoded {
        Ok(decoded) => Message {
            id: id.to_string(),
            body: decoded.body,
            context_key: decoded
                .context_value
                .as_ref()
                .and(config.context_key.clone()),
            context_value: decoded.context_value,
            error: None,
        },
        Err(err) => Message::failed(id.to_string(), err),
    }
}

fn decode_json(
    id: &str,
    raw: &str,
    subset_key: Option<&str>,
    context_key: Option<&str>,
) -> Result<Decoded, TransformError> {
    let doc = serde_json::from_str::<Map<String, Value>>(raw).map_err(|err| {
        TransformError::MalformedBody {
            id: id.to_string(),
            body: raw.to_string(),
            reason: err.to_string(),
        }
    })?;

    match (subset_key, context_key) {
        (None, None) => Ok(Decoded {
            body: indented(doc),
            context_value: None,
        }),
        // The body stays as received; only the context value is pulled out.
        (None, Some(key)) => {
            let value = lookup_context(&doc, key, id, raw)?;
            Ok(Decoded {
                body: raw.to_string(),
                context_value: Some(value),
            })
        }
        (Some(subset_key), context_key) => {
            let subset = resolve_subset(&doc, subset_key, id, raw)?;
            let context_value = context_key
                .map(|key| lookup_context(&subset, key, id, raw))
                .transpose()?;
            Ok(Decoded {
                body: indented(subset),
                context_value,
            })
        }
    }
}

fn resolve_subset(
    doc: &Map<String, Value>,
    key: &str,
    id: &str,
    raw: &str,
) -> Result<Map<String, Value>, TransformError> {
    match doc.get(key) {
        None => Err(TransformError::SubsetKeyNotFound {
            id: id.to_string(),
            body: raw.to_string(),
            key: key.to_string(),
        }),
        Some(Value::Object(obj)) => Ok(obj.clone()),
        // Producers often stringify nested payloads.
        Some(Value::String(nested)) => serde_json::from_str::<Map<String, Value>>(nested)
            .map_err(|err| TransformError::SubsetUnparseable {
                id: id.to_string(),
                body: raw.to_string(),
                key: key.to_string(),
                reason: err.to_string(),
            }),
        Some(other) => Err(TransformError::SubsetTypeUnsupported {
            id: id.to_string(),
            body: raw.to_string(),
            key: key.to_string(),
            found: json_type_name(other),
        }),
    }
}

fn lookup_context(
    obj: &Map<String, Value>,
    key: &str,
    id: &str,
    raw: &str,
) -> Result<String, TransformError> {
    match obj.get(key) {
        None => Err(TransformError::ContextKeyNotFound {
            id: id.to_string(),
            body: raw.to_string(),
            key: key.to_string(),
        }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(TransformError::ContextValueNotString {
            id: id.to_string(),
            body: raw.to_string(),
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Two-space indentation with keys in sorted order.
fn indented(obj: Map<String, Value>) -> String {
    format!("{:#}", Value::Object(obj))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
