use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::field::{FieldMap, FieldValue};
use crate::simulation::PremiumEstimate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Required,
    InvalidFormat,
    OutOfRange,
    ConditionallyRequired,
    MandatoryOptionMissing,
    NotInCatalog,
    NotAccepted,
    AttachmentTooLarge,
    TooManyAttachments,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// Field key -> error of the last validation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&FieldError> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, error: FieldError) {
        self.0.insert(key.into(), error);
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldError> {
        self.0.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.0.iter().map(|(key, error)| (key.as_str(), error))
    }

    /// Plain key -> message view for renderers.
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.0.iter().map(|(key, error)| (key.clone(), error.message.clone())).collect()
    }
}

impl FromIterator<(String, FieldError)> for FieldErrors {
    fn from_iter<T: IntoIterator<Item = (String, FieldError)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Moved { from: usize, to: usize },
    /// Already at the boundary; nothing changed.
    Stayed { step: usize },
    Refused { step: usize, errors: FieldErrors },
}

impl NavigationOutcome {
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused { .. })
    }

    pub fn current_step(&self) -> usize {
        match self {
            Self::Moved { to, .. } => *to,
            Self::Stayed { step } | Self::Refused { step, .. } => *step,
        }
    }
}

/// Mutable state of one wizard instance. Only the engine writes to it.
#[derive(Clone, Debug, PartialEq)]
pub struct WizardState {
    pub(crate) current_step: usize,
    pub(crate) total_steps: usize,
    pub(crate) fields: FieldMap,
    pub(crate) errors: FieldErrors,
    pub(crate) is_submitting: bool,
    pub(crate) completed: bool,
    pub(crate) simulation: Option<PremiumEstimate>,
}

impl WizardState {
    pub(crate) fn new(total_steps: usize, fields: FieldMap) -> Self {
        Self {
            current_step: 1,
            total_steps,
            fields,
            errors: FieldErrors::new(),
            is_submitting: false,
            completed: false,
            simulation: None,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn is_final_step(&self) -> bool {
        self.current_step == self.total_steps
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn simulation(&self) -> Option<&PremiumEstimate> {
        self.simulation.as_ref()
    }
}
