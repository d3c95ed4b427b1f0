use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::field::{FieldKind, FieldMap, FieldValue};
use crate::domain::product::{ProductKind, WizardId};
use crate::errors::ApplicationError;
use crate::simulation::PremiumEstimate;
use crate::wizard::spec::StepSpecification;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub field: String,
    pub name: String,
    pub size_bytes: u64,
}

/// Finished, validated answers handed to the submission collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub reference: Uuid,
    pub wizard_id: WizardId,
    pub product: ProductKind,
    pub fields: BTreeMap<String, FieldValue>,
    pub attachments: Vec<AttachmentEntry>,
    pub simulation: Option<PremiumEstimate>,
    pub assembled_at: DateTime<Utc>,
}

impl SubmissionPayload {
    /// Collects every non-transient answer; attachment fields are flattened into
    /// `attachments` instead of being repeated in `fields`.
    pub fn assemble(
        wizard_id: &WizardId,
        spec: &StepSpecification,
        fields: &FieldMap,
        simulation: Option<PremiumEstimate>,
    ) -> Self {
        let mut values = BTreeMap::new();
        let mut attachments = Vec::new();

        for schema in spec.schema().iter().filter(|schema| !schema.transient) {
            let Some(value) = fields.get(&schema.key) else {
                continue;
            };

            if schema.kind == FieldKind::Attachments {
                attachments.extend(value.as_attachments().unwrap_or(&[]).iter().map(|item| {
                    AttachmentEntry {
                        field: schema.key.clone(),
                        name: item.name.clone(),
                        size_bytes: item.size_bytes,
                    }
                }));
                continue;
            }

            values.insert(schema.key.clone(), value.clone());
        }

        Self {
            reference: Uuid::new_v4(),
            wizard_id: wizard_id.clone(),
            product: spec.product(),
            fields: values,
            attachments,
            simulation,
            assembled_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub reference: Uuid,
    pub accepted_at: DateTime<Utc>,
    /// Where the collaborator recorded the request, when it exposes one.
    pub location: Option<String>,
}

impl SubmissionReceipt {
    pub fn new(reference: Uuid) -> Self {
        Self { reference, accepted_at: Utc::now(), location: None }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, ApplicationError>;
}

/// Records payloads in memory; can be told to fail to exercise retry paths.
#[derive(Clone, Default)]
pub struct InMemorySubmitter {
    payloads: Arc<Mutex<Vec<SubmissionPayload>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl InMemorySubmitter {
    pub fn failing(message: impl Into<String>) -> Self {
        let submitter = Self::default();
        submitter.set_failure(Some(message.into()));
        submitter
    }

    pub fn set_failure(&self, message: Option<String>) {
        match self.failure.lock() {
            Ok(mut failure) => *failure = message,
            Err(poisoned) => *poisoned.into_inner() = message,
        }
    }

    pub fn payloads(&self) -> Vec<SubmissionPayload> {
        match self.payloads.lock() {
            Ok(payloads) => payloads.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn current_failure(&self) -> Option<String> {
        match self.failure.lock() {
            Ok(failure) => failure.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Submitter for InMemorySubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, ApplicationError> {
        match self.payloads.lock() {
            Ok(mut payloads) => payloads.push(payload.clone()),
            Err(poisoned) => poisoned.into_inner().push(payload.clone()),
        }

        if let Some(message) = self.current_failure() {
            return Err(ApplicationError::Integration(message));
        }

        Ok(SubmissionReceipt::new(payload.reference).with_location("memory"))
    }
}
