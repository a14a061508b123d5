use std::collections::BTreeMap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Message produced for a field or for the whole form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintViolationMessage {
    pub severity: Severity,
    pub text: String,
    pub message_key: String,
    pub args: BTreeMap<String, String>,
}

impl ConstraintViolationMessage {
    pub fn new(severity: Severity, text: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            message_key: message_key.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn error(text: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(Severity::Error, text, message_key)
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// A submitted value that could not be converted to its property type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub property: String,
    pub value: String,
    pub target_type: String,
    pub message: String,
}

impl ParseError {
    pub fn new(
        property: impl Into<String>,
        value: impl Into<String>,
        target_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            target_type: target_type.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestErrorKind {
    MaxRequestSizeExceeded,
    MaxFileSizeExceeded,
    Other,
}

/// Failure raised while the request itself was processed (upload limits and
/// the like), reported by the parameter source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestProcessingError {
    pub kind: RequestErrorKind,
    pub message: String,
}

impl RequestProcessingError {
    pub fn new(kind: RequestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Field and global messages of a bind.
///
/// Field messages are keyed by full field path. Equal messages on one field
/// are kept once; distinct messages accumulate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    field_messages: IndexMap<String, IndexSet<ConstraintViolationMessage>>,
    global_messages: IndexSet<ConstraintViolationMessage>,
}

impl ValidationReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(
        field_messages: IndexMap<String, IndexSet<ConstraintViolationMessage>>,
        global_messages: IndexSet<ConstraintViolationMessage>,
    ) -> Self {
        Self {
            field_messages,
            global_messages,
        }
    }

    pub fn field_messages(&self) -> &IndexMap<String, IndexSet<ConstraintViolationMessage>> {
        &self.field_messages
    }

    pub fn global_messages(&self) -> &IndexSet<ConstraintViolationMessage> {
        &self.global_messages
    }

    pub fn messages_for(&self, path: &str) -> impl Iterator<Item = &ConstraintViolationMessage> + '_ {
        self.field_messages.get(path).into_iter().flatten()
    }

    pub fn add_field_message(&mut self, path: impl Into<String>, msg: ConstraintViolationMessage) {
        self.field_messages.entry(path.into()).or_default().insert(msg);
    }

    pub fn add_global_message(&mut self, msg: ConstraintViolationMessage) {
        self.global_messages.insert(msg);
    }

    // union
    pub fn merge(&mut self, other: ValidationReport) {
        for (path, msgs) in other.field_messages {
            self.field_messages.entry(path).or_default().extend(msgs);
        }
        self.global_messages.extend(other.global_messages);
    }

    pub fn is_empty(&self) -> bool {
        self.global_messages.is_empty() && self.field_messages.values().all(IndexSet::is_empty)
    }

    /// No message of error severity anywhere.
    pub fn is_success(&self) -> bool {
        let no_error = |m: &ConstraintViolationMessage| m.severity < Severity::Error;
        self.global_messages.iter().all(no_error)
            && self.field_messages.values().flatten().all(no_error)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "field messages:")?;
        for (path, msgs) in &self.field_messages {
            for msg in msgs {
                writeln!(f, "  {path}: [{:?}] {}", msg.severity, msg.text)?;
            }
        }
        writeln!(f, "global messages:")?;
        for msg in &self.global_messages {
            writeln!(f, "  [{:?}] {}", msg.severity, msg.text)?;
        }
        Ok(())
    }
}
