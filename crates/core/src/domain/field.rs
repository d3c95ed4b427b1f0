use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Accumulated answers of one wizard, keyed by schema field key.
pub type FieldMap = BTreeMap<String, FieldValue>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// Single option id picked from a catalog list.
    Choice,
    Number,
    Flag,
    /// Set of option ids picked from a catalog list.
    MultiChoice,
    Attachments,
}

impl FieldKind {
    pub fn default_value(self) -> FieldValue {
        match self {
            Self::Text | Self::Choice => FieldValue::Text(String::new()),
            Self::Number => FieldValue::Empty,
            Self::Flag => FieldValue::Flag(false),
            Self::MultiChoice => FieldValue::Selection(BTreeSet::new()),
            Self::Attachments => FieldValue::Attachments(Vec::new()),
        }
    }

    pub fn accepts(self, value: &FieldValue) -> bool {
        match (self, value) {
            (Self::Flag, FieldValue::Empty) => false,
            (_, FieldValue::Empty) => true,
            (Self::Text | Self::Choice, FieldValue::Text(_)) => true,
            (Self::Number, FieldValue::Number(_)) => true,
            (Self::Flag, FieldValue::Flag(_)) => true,
            (Self::MultiChoice, FieldValue::Selection(_)) => true,
            (Self::Attachments, FieldValue::Attachments(_)) => true,
            _ => false,
        }
    }
}

/// Metadata of a file picked by the user. The bytes stay with the file picker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size_bytes: u64,
}

impl Attachment {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self { name: name.into(), size_bytes }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(Decimal),
    Flag(bool),
    Selection(BTreeSet<String>),
    Attachments(Vec<Attachment>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn number(value: impl Into<Decimal>) -> Self {
        Self::Number(value.into())
    }

    pub fn selection<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Selection(values.into_iter().map(Into::into).collect())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(value) => value.trim().is_empty(),
            Self::Number(_) => false,
            Self::Flag(value) => !value,
            Self::Selection(values) => values.is_empty(),
            Self::Attachments(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Selection(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_attachments(&self) -> Option<&[Attachment]> {
        match self {
            Self::Attachments(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}
