use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use crate::catalog::{Catalog, CatalogOption};
use crate::domain::field::{Attachment, FieldKind, FieldMap, FieldValue};
use crate::domain::product::{ProductKind, WizardId};
use crate::errors::ApplicationError;
use crate::simulation::PremiumEstimate;
use crate::submission::{SubmissionPayload, SubmissionReceipt, Submitter};
use crate::wizard::spec::{StepDefinition, StepSpecification};
use crate::wizard::state::{FieldError, FieldErrors, NavigationOutcome, WizardState};
use crate::wizard::validation::{AttachmentLimits, ValidationContext};

const ENGINE_ACTOR: &str = "wizard-engine";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("field `{key}` is not part of the {product} wizard")]
    UnknownField { product: ProductKind, key: String },
    #[error("field `{key}` expects a {expected:?} value")]
    KindMismatch { key: String, expected: FieldKind },
    #[error("field `{key}` does not hold attachments")]
    NotAnAttachmentField { key: String },
    #[error("wizard {wizard_id} was already submitted")]
    AlreadySubmitted { wizard_id: WizardId },
    #[error("wizard {wizard_id} is locked while its submission is in flight")]
    SubmissionInFlight { wizard_id: WizardId },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("the wizard was already submitted")]
    AlreadySubmitted,
    #[error("no submission is in flight")]
    NotSubmitting,
    #[error("submission requires step {total}, wizard is on step {current}")]
    NotOnFinalStep { current: usize, total: usize },
    #[error("final step has invalid fields: {}", .errors.keys().collect::<Vec<_>>().join(", "))]
    Validation { errors: FieldErrors },
    #[error("submission was not delivered: {0}")]
    Delivery(ApplicationError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentOutcome {
    Accepted,
    /// The list is unchanged; the error is also recorded on the field.
    Rejected(FieldError),
}

/// Generic multi-step quote wizard driven by a [`StepSpecification`].
///
/// All transitions are synchronous except [`WizardEngine::submit`], whose only
/// suspension point is the submission collaborator.
pub struct WizardEngine {
    spec: Arc<StepSpecification>,
    catalog: Arc<Catalog>,
    limits: AttachmentLimits,
    reference_year: Option<i32>,
    audit: Arc<dyn AuditSink>,
    audit_context: AuditContext,
    state: WizardState,
}

impl WizardEngine {
    pub fn new(spec: Arc<StepSpecification>, catalog: Arc<Catalog>) -> Self {
        let wizard_id = WizardId::generate();
        let state = WizardState::new(spec.total_steps(), spec.initial_fields());
        let audit_context = AuditContext::new(wizard_id.clone(), wizard_id.0.clone(), ENGINE_ACTOR);

        Self {
            spec,
            catalog,
            limits: AttachmentLimits::default(),
            reference_year: None,
            audit: Arc::new(TracingAuditSink),
            audit_context,
            state,
        }
    }

    pub fn with_limits(mut self, limits: AttachmentLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Pins the year used by year-range checks instead of the current UTC year.
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>, context: AuditContext) -> Self {
        self.audit = sink;
        self.audit_context = context;
        self
    }

    pub fn id(&self) -> &WizardId {
        &self.audit_context.wizard_id
    }

    pub fn product(&self) -> ProductKind {
        self.spec.product()
    }

    pub fn spec(&self) -> &StepSpecification {
        &self.spec
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.state.total_steps
    }

    pub fn fields(&self) -> &FieldMap {
        &self.state.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.state.fields.get(key)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.state.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.state.is_submitting
    }

    pub fn simulation(&self) -> Option<&PremiumEstimate> {
        self.state.simulation.as_ref()
    }

    pub fn current_step_definition(&self) -> Option<&StepDefinition> {
        self.spec.step(self.state.current_step)
    }

    /// Options a renderer should offer for `key`, empty for free-form fields.
    pub fn options_for(&self, key: &str) -> &[CatalogOption] {
        self.spec
            .field(key)
            .and_then(|schema| schema.options)
            .map(|list| self.catalog.options(list))
            .unwrap_or(&[])
    }

    fn validation_context(&self) -> ValidationContext<'_> {
        let context = ValidationContext::new(&self.catalog, self.limits);
        match self.reference_year {
            Some(year) => context.with_reference_year(year),
            None => context,
        }
    }

    /// Dry-run of the current step validator; does not touch `errors`.
    pub fn validate_current_step(&self) -> FieldErrors {
        match self.current_step_definition() {
            Some(step) => step.validate(&self.state.fields, &self.validation_context()),
            None => FieldErrors::new(),
        }
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.state.is_submitting {
            return Err(WizardError::SubmissionInFlight { wizard_id: self.id().clone() });
        }
        if self.state.completed {
            return Err(WizardError::AlreadySubmitted { wizard_id: self.id().clone() });
        }
        Ok(())
    }

    fn field_kind(&self, key: &str) -> Result<FieldKind, WizardError> {
        self.spec
            .field(key)
            .map(|schema| schema.kind)
            .ok_or_else(|| WizardError::UnknownField { product: self.product(), key: key.to_string() })
    }

    fn attachment_field(&self, key: &str) -> Result<(), WizardError> {
        match self.field_kind(key)? {
            FieldKind::Attachments => Ok(()),
            _ => Err(WizardError::NotAnAttachmentField { key: key.to_string() }),
        }
    }

    /// Overwrites one answer and drops its pending error without re-validating.
    pub fn set_field(&mut self, key: &str, value: FieldValue) -> Result<(), WizardError> {
        self.ensure_open()?;
        let kind = self.field_kind(key)?;
        if !kind.accepts(&value) {
            return Err(WizardError::KindMismatch { key: key.to_string(), expected: kind });
        }

        self.state.fields.insert(key.to_string(), value);
        self.state.errors.remove(key);
        debug!(
            event_name = "wizard.field_set",
            wizard_id = %self.id(),
            product = %self.product(),
            step = self.state.current_step,
            field = key,
            "wizard field updated"
        );

        if self.spec.simulation().is_some_and(|hook| hook.is_input(key)) {
            self.refresh_simulation();
        }
        Ok(())
    }

    pub fn add_attachment(&mut self, key: &str, attachment: Attachment) -> Result<AttachmentOutcome, WizardError> {
        self.ensure_open()?;
        self.attachment_field(key)?;

        let current = self.state.fields.get(key).and_then(FieldValue::as_attachments).unwrap_or(&[]);
        if let Some(error) = self.limits.check_candidate(current, &attachment) {
            warn!(
                event_name = "wizard.attachment_rejected",
                wizard_id = %self.id(),
                field = key,
                file_name = %attachment.name,
                size_bytes = attachment.size_bytes,
                reason = ?error.kind,
                "attachment rejected"
            );
            self.emit(
                self.audit_event("wizard.attachment_rejected", AuditCategory::Attachment, AuditOutcome::Rejected)
                    .with_metadata("field", key)
                    .with_metadata("size_bytes", attachment.size_bytes.to_string()),
            );
            self.state.errors.insert(key, error.clone());
            return Ok(AttachmentOutcome::Rejected(error));
        }

        let mut items = current.to_vec();
        items.push(attachment);
        let count = items.len();
        self.state.fields.insert(key.to_string(), FieldValue::Attachments(items));
        self.state.errors.remove(key);
        self.emit(
            self.audit_event("wizard.attachment_added", AuditCategory::Attachment, AuditOutcome::Success)
                .with_metadata("field", key)
                .with_metadata("count", count.to_string()),
        );
        Ok(AttachmentOutcome::Accepted)
    }

    /// Removes the entry at `index`; an out-of-range index is ignored.
    pub fn remove_attachment(&mut self, key: &str, index: usize) -> Result<Option<Attachment>, WizardError> {
        self.ensure_open()?;
        self.attachment_field(key)?;

        let removed = match self.state.fields.get_mut(key) {
            Some(FieldValue::Attachments(items)) if index < items.len() => Some(items.remove(index)),
            _ => None,
        };

        if removed.is_some() {
            self.state.errors.remove(key);
            self.emit(
                self.audit_event("wizard.attachment_removed", AuditCategory::Attachment, AuditOutcome::Success)
                    .with_metadata("field", key)
                    .with_metadata("index", index.to_string()),
            );
        }
        Ok(removed)
    }

    pub fn go_next(&mut self) -> NavigationOutcome {
        let step = self.state.current_step;
        if self.state.completed || self.state.is_submitting {
            return NavigationOutcome::Stayed { step };
        }

        let errors = self.validate_current_step();
        if !errors.is_empty() {
            info!(
                event_name = "wizard.step_refused",
                wizard_id = %self.id(),
                product = %self.product(),
                step,
                invalid_fields = errors.len(),
                "step validation failed"
            );
            self.emit(
                self.audit_event("wizard.step_refused", AuditCategory::Validation, AuditOutcome::Rejected)
                    .with_metadata("step", step.to_string())
                    .with_metadata("fields", errors.keys().collect::<Vec<_>>().join(",")),
            );
            self.state.errors = errors.clone();
            return NavigationOutcome::Refused { step, errors };
        }

        self.state.errors = FieldErrors::new();
        if step >= self.state.total_steps {
            return NavigationOutcome::Stayed { step };
        }

        let to = step + 1;
        self.state.current_step = to;
        info!(
            event_name = "wizard.step_advanced",
            wizard_id = %self.id(),
            product = %self.product(),
            from = step,
            to,
            "wizard advanced"
        );
        self.emit(
            self.audit_event("wizard.step_advanced", AuditCategory::Navigation, AuditOutcome::Success)
                .with_metadata("from", step.to_string())
                .with_metadata("to", to.to_string()),
        );
        self.refresh_simulation();
        NavigationOutcome::Moved { from: step, to }
    }

    /// Steps back without validating; answers and errors are left untouched.
    pub fn go_previous(&mut self) -> NavigationOutcome {
        let step = self.state.current_step;
        if self.state.completed || self.state.is_submitting || step <= 1 {
            return NavigationOutcome::Stayed { step };
        }

        let to = step - 1;
        self.state.current_step = to;
        debug!(
            event_name = "wizard.step_retreated",
            wizard_id = %self.id(),
            from = step,
            to,
            "wizard moved back"
        );
        self.emit(
            self.audit_event("wizard.step_retreated", AuditCategory::Navigation, AuditOutcome::Success)
                .with_metadata("from", step.to_string())
                .with_metadata("to", to.to_string()),
        );
        self.refresh_simulation();
        NavigationOutcome::Moved { from: step, to }
    }

    /// Validates the final step, raises the in-flight flag and assembles the payload.
    ///
    /// Fails without side effects while a previous submission is in flight.
    pub fn begin_submission(&mut self) -> Result<SubmissionPayload, SubmitError> {
        if self.state.is_submitting {
            return Err(SubmitError::AlreadySubmitting);
        }
        if self.state.completed {
            return Err(SubmitError::AlreadySubmitted);
        }
        if !self.state.is_final_step() {
            return Err(SubmitError::NotOnFinalStep {
                current: self.state.current_step,
                total: self.state.total_steps,
            });
        }

        let errors = self.validate_current_step();
        if !errors.is_empty() {
            info!(
                event_name = "wizard.submission_refused",
                wizard_id = %self.id(),
                invalid_fields = errors.len(),
                "final step validation failed"
            );
            self.state.errors = errors.clone();
            return Err(SubmitError::Validation { errors });
        }

        self.state.errors = FieldErrors::new();
        self.state.is_submitting = true;
        let payload = SubmissionPayload::assemble(
            self.id(),
            &self.spec,
            &self.state.fields,
            self.state.simulation.clone(),
        );
        info!(
            event_name = "wizard.submission_started",
            wizard_id = %self.id(),
            product = %self.product(),
            reference = %payload.reference,
            attachments = payload.attachments.len(),
            "submission started"
        );
        Ok(payload)
    }

    /// Lowers the in-flight flag; a failure leaves every answer in place for a retry.
    ///
    /// Only valid after a successful [`WizardEngine::begin_submission`].
    pub fn finish_submission(
        &mut self,
        result: Result<SubmissionReceipt, ApplicationError>,
    ) -> Result<SubmissionReceipt, SubmitError> {
        if !self.state.is_submitting {
            return Err(SubmitError::NotSubmitting);
        }
        self.state.is_submitting = false;

        match result {
            Ok(receipt) => {
                self.state.completed = true;
                info!(
                    event_name = "wizard.submission_succeeded",
                    wizard_id = %self.id(),
                    reference = %receipt.reference,
                    "submission delivered"
                );
                self.emit(
                    self.audit_event("wizard.submission_succeeded", AuditCategory::Submission, AuditOutcome::Success)
                        .with_metadata("reference", receipt.reference.to_string()),
                );
                Ok(receipt)
            }
            Err(error) => {
                warn!(
                    event_name = "wizard.submission_failed",
                    wizard_id = %self.id(),
                    error = %error,
                    "submission failed"
                );
                self.emit(
                    self.audit_event("wizard.submission_failed", AuditCategory::Submission, AuditOutcome::Failed)
                        .with_metadata("error", error.to_string()),
                );
                Err(SubmitError::Delivery(error))
            }
        }
    }

    pub async fn submit<S>(&mut self, submitter: &S) -> Result<SubmissionReceipt, SubmitError>
    where
        S: Submitter + ?Sized,
    {
        let payload = self.begin_submission()?;
        let result = submitter.submit(&payload).await;
        self.finish_submission(result)
    }

    fn refresh_simulation(&mut self) {
        let spec = Arc::clone(&self.spec);
        let Some(hook) = spec.simulation() else {
            return;
        };
        if self.state.current_step != hook.display_step {
            return;
        }

        let estimate = (hook.compute)(&self.state.fields);
        if estimate != self.state.simulation {
            let premium = estimate
                .as_ref()
                .map(|estimate| estimate.monthly_premium.to_string())
                .unwrap_or_else(|| "none".to_string());
            debug!(
                event_name = "wizard.simulation_updated",
                wizard_id = %self.id(),
                monthly_premium = %premium,
                "simulation recomputed"
            );
            self.emit(
                self.audit_event("wizard.simulation_updated", AuditCategory::Simulation, AuditOutcome::Success)
                    .with_metadata("monthly_premium", premium),
            );
        }
        self.state.simulation = estimate;
    }

    fn audit_event(&self, event_type: &str, category: AuditCategory, outcome: AuditOutcome) -> AuditEvent {
        AuditEvent::new(&self.audit_context, event_type, category, outcome)
    }

    fn emit(&self, event: AuditEvent) {
        self.audit.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::catalog::{Catalog, CatalogList};
    use crate::domain::field::{Attachment, FieldKind, FieldValue};
    use crate::domain::product::{ProductKind, WizardId};
    use crate::simulation::estimate_from_fields;
    use crate::submission::InMemorySubmitter;
    use crate::wizard::spec::{
        Branch, Condition, FieldRule, FieldSchema, SimulationHook, StepDefinition, StepSpecification,
    };
    use crate::wizard::state::{FieldErrorKind, NavigationOutcome};

    use super::{AttachmentOutcome, SubmitError, WizardEngine, WizardError};

    fn spec() -> StepSpecification {
        StepSpecification::builder(ProductKind::Health)
            .field(FieldSchema::number("age", "Age"))
            .field(FieldSchema::text("name", "Name"))
            .field(FieldSchema::choice("coverage_tier", "Tier", CatalogList::CoverageTiers))
            .field(FieldSchema::multi_choice("coverages", "Coverages", CatalogList::HealthCoverages))
            .field(FieldSchema::choice("smoker", "Smoker", CatalogList::YesNo))
            .field(FieldSchema::text("smoker_details", "Details"))
            .field(FieldSchema::attachments("documents", "Documents"))
            .field(FieldSchema::flag("terms_accepted", "Terms"))
            .step(
                StepDefinition::new("Profile")
                    .renders(&["age", "name"])
                    .rule(FieldRule::new("age").required("Age is required").range(18, 80, "Age out of range"))
                    .rule(FieldRule::new("name").required("Name is required")),
            )
            .step(
                StepDefinition::new("Needs")
                    .renders(&["coverage_tier", "coverages", "smoker", "smoker_details"])
                    .rule(FieldRule::new("coverage_tier").required("Pick a tier"))
                    .branch(
                        Branch::when(Condition::equals("smoker", "yes"))
                            .rule(FieldRule::new("smoker_details").required("Tell us more")),
                    ),
            )
            .step(
                StepDefinition::new("Confirm")
                    .renders(&["documents", "terms_accepted"])
                    .rule(FieldRule::new("documents").attachment_limits())
                    .rule(FieldRule::new("terms_accepted").accepted("Accept the terms")),
            )
            .simulation(SimulationHook::new(3, &["age", "coverage_tier", "coverages"], estimate_from_fields))
            .build()
            .expect("valid spec")
    }

    fn engine() -> (WizardEngine, InMemoryAuditSink) {
        let sink = InMemoryAuditSink::default();
        let engine = WizardEngine::new(Arc::new(spec()), Arc::new(Catalog::standard()))
            .with_reference_year(2026)
            .with_audit(Arc::new(sink.clone()), AuditContext::new(WizardId("WZ-T".to_string()), "req-9", "test"));
        (engine, sink)
    }

    fn reach_final_step(engine: &mut WizardEngine) {
        engine.set_field("age", FieldValue::number(35)).expect("age");
        engine.set_field("name", FieldValue::text("Salma")).expect("name");
        assert_eq!(engine.go_next(), NavigationOutcome::Moved { from: 1, to: 2 });
        engine.set_field("coverage_tier", FieldValue::text("confort")).expect("tier");
        engine.set_field("coverages", FieldValue::selection(["dental", "optical"])).expect("coverages");
        assert_eq!(engine.go_next(), NavigationOutcome::Moved { from: 2, to: 3 });
    }

    #[test]
    fn refused_step_reports_every_invalid_field_and_stays() {
        let (mut engine, sink) = engine();
        engine.set_field("age", FieldValue::number(90)).expect("age");

        let outcome = engine.go_next();
        assert!(outcome.is_refused());
        assert_eq!(engine.current_step(), 1);
        assert_eq!(engine.errors().len(), 2);
        assert_eq!(engine.errors().get("age").map(|error| error.kind), Some(FieldErrorKind::OutOfRange));
        assert_eq!(engine.errors().get("name").map(|error| error.kind), Some(FieldErrorKind::Required));
        assert_eq!(sink.event_types(), vec!["wizard.step_refused".to_string()]);
    }

    #[test]
    fn set_field_clears_only_its_own_error() {
        let (mut engine, _) = engine();
        engine.go_next();
        assert_eq!(engine.errors().len(), 2);

        engine.set_field("name", FieldValue::text("Salma")).expect("name");
        assert!(!engine.errors().contains("name"));
        assert!(engine.errors().contains("age"));
    }

    #[test]
    fn set_field_round_trips_every_value_kind() {
        let (mut engine, _) = engine();
        let values = [
            ("age", FieldValue::number(42)),
            ("name", FieldValue::text("Youssef")),
            ("coverages", FieldValue::selection(["dental"])),
            ("terms_accepted", FieldValue::Flag(true)),
            ("documents", FieldValue::Attachments(vec![Attachment::new("cin.pdf", 10)])),
        ];

        for (key, value) in values {
            engine.set_field(key, value.clone()).expect("value accepted");
            assert_eq!(engine.field(key), Some(&value));
        }
    }

    #[test]
    fn set_field_rejects_unknown_keys_and_foreign_kinds() {
        let (mut engine, _) = engine();

        assert_eq!(
            engine.set_field("shoe_size", FieldValue::number(42)),
            Err(WizardError::UnknownField { product: ProductKind::Health, key: "shoe_size".to_string() })
        );
        assert_eq!(
            engine.set_field("age", FieldValue::text("35")),
            Err(WizardError::KindMismatch { key: "age".to_string(), expected: FieldKind::Number })
        );
    }

    #[test]
    fn previous_keeps_answers_and_is_idempotent_on_first_step() {
        let (mut engine, _) = engine();
        assert_eq!(engine.go_previous(), NavigationOutcome::Stayed { step: 1 });

        reach_final_step(&mut engine);
        let before = engine.fields().clone();
        assert_eq!(engine.go_previous(), NavigationOutcome::Moved { from: 3, to: 2 });
        assert_eq!(engine.go_previous(), NavigationOutcome::Moved { from: 2, to: 1 });
        assert_eq!(engine.go_previous(), NavigationOutcome::Stayed { step: 1 });
        assert_eq!(engine.fields(), &before);

        assert_eq!(engine.go_next(), NavigationOutcome::Moved { from: 1, to: 2 });
        assert_eq!(engine.field("coverage_tier"), Some(&FieldValue::text("confort")));
    }

    #[test]
    fn previous_does_not_clear_pending_errors() {
        let (mut engine, _) = engine();
        reach_final_step(&mut engine);
        assert!(engine.go_next().is_refused());
        assert!(engine.errors().contains("terms_accepted"));

        engine.go_previous();
        assert!(engine.errors().contains("terms_accepted"));
    }

    #[test]
    fn branch_field_is_only_required_while_governed() {
        let (mut engine, _) = engine();
        engine.set_field("age", FieldValue::number(35)).expect("age");
        engine.set_field("name", FieldValue::text("Salma")).expect("name");
        engine.go_next();
        engine.set_field("coverage_tier", FieldValue::text("essentiel")).expect("tier");
        engine.set_field("smoker", FieldValue::text("yes")).expect("smoker");

        let outcome = engine.go_next();
        assert!(outcome.is_refused());
        assert_eq!(engine.errors().keys().collect::<Vec<_>>(), vec!["smoker_details"]);
        assert_eq!(
            engine.errors().get("smoker_details").map(|error| error.kind),
            Some(FieldErrorKind::ConditionallyRequired)
        );

        engine.set_field("smoker", FieldValue::text("no")).expect("smoker");
        assert_eq!(engine.go_next(), NavigationOutcome::Moved { from: 2, to: 3 });
    }

    #[test]
    fn simulation_appears_on_display_step_and_follows_inputs() {
        let (mut engine, sink) = engine();
        engine.set_field("age", FieldValue::number(35)).expect("age");
        assert!(engine.simulation().is_none());

        reach_final_step(&mut engine);
        let estimate = engine.simulation().expect("estimate on display step");
        assert_eq!(estimate.monthly_premium, rust_decimal::Decimal::from(476));

        engine.set_field("coverage_tier", FieldValue::text("premium")).expect("tier");
        // (240 + 100) * 1.8 = 612
        assert_eq!(
            engine.simulation().map(|estimate| estimate.monthly_premium),
            Some(rust_decimal::Decimal::from(612))
        );
        assert!(sink.event_types().iter().any(|event| event == "wizard.simulation_updated"));

        engine.go_previous();
        engine.set_field("coverage_tier", FieldValue::text("essentiel")).expect("tier");
        assert_eq!(
            engine.simulation().map(|estimate| estimate.monthly_premium),
            Some(rust_decimal::Decimal::from(612)),
            "estimate is only recomputed on the display step"
        );
    }

    #[test]
    fn attachments_respect_size_limit() {
        let (mut engine, _) = engine();

        let rejected = engine
            .add_attachment("documents", Attachment::new("scan.tiff", 6 * 1024 * 1024))
            .expect("attachment field");
        assert!(matches!(rejected, AttachmentOutcome::Rejected(ref error) if error.kind == FieldErrorKind::AttachmentTooLarge));
        assert_eq!(engine.field("documents").and_then(|value| value.as_attachments()).map(|items| items.len()), Some(0));
        assert!(engine.errors().contains("documents"));

        let accepted = engine
            .add_attachment("documents", Attachment::new("cin.pdf", 4 * 1024 * 1024))
            .expect("attachment field");
        assert_eq!(accepted, AttachmentOutcome::Accepted);
        assert_eq!(engine.field("documents").and_then(|value| value.as_attachments()).map(|items| items.len()), Some(1));
        assert!(!engine.errors().contains("documents"));
    }

    #[test]
    fn remove_attachment_ignores_out_of_range_indexes() {
        let (mut engine, _) = engine();
        assert_eq!(engine.remove_attachment("documents", 0), Ok(None));

        engine.add_attachment("documents", Attachment::new("a.pdf", 1)).expect("add");
        engine.add_attachment("documents", Attachment::new("b.pdf", 2)).expect("add");
        assert_eq!(engine.remove_attachment("documents", 7), Ok(None));
        assert_eq!(engine.remove_attachment("documents", 0), Ok(Some(Attachment::new("a.pdf", 1))));
        assert_eq!(
            engine.field("documents"),
            Some(&FieldValue::Attachments(vec![Attachment::new("b.pdf", 2)]))
        );

        assert_eq!(
            engine.remove_attachment("name", 0),
            Err(WizardError::NotAnAttachmentField { key: "name".to_string() })
        );
    }

    #[tokio::test]
    async fn submit_requires_final_step_and_valid_answers() {
        let (mut engine, _) = engine();
        let submitter = InMemorySubmitter::default();

        assert_eq!(
            engine.submit(&submitter).await,
            Err(SubmitError::NotOnFinalStep { current: 1, total: 3 })
        );

        reach_final_step(&mut engine);
        let error = engine.submit(&submitter).await.expect_err("terms not accepted");
        assert!(matches!(error, SubmitError::Validation { ref errors } if errors.contains("terms_accepted")));
        assert!(engine.errors().contains("terms_accepted"));
        assert!(submitter.payloads().is_empty());
        assert!(!engine.is_submitting());
    }

    #[tokio::test]
    async fn duplicate_submission_is_suppressed_while_in_flight() {
        let (mut engine, _) = engine();
        let submitter = InMemorySubmitter::default();
        reach_final_step(&mut engine);
        engine.set_field("terms_accepted", FieldValue::Flag(true)).expect("terms");

        let payload = engine.begin_submission().expect("first submission starts");
        assert!(engine.is_submitting());

        assert_eq!(engine.submit(&submitter).await, Err(SubmitError::AlreadySubmitting));
        assert!(submitter.payloads().is_empty());

        let receipt = engine
            .finish_submission(Ok(crate::submission::SubmissionReceipt::new(payload.reference)))
            .expect("delivered");
        assert_eq!(receipt.reference, payload.reference);
        assert!(!engine.is_submitting());
        assert!(engine.state().is_completed());
        assert_eq!(engine.submit(&submitter).await, Err(SubmitError::AlreadySubmitted));
        assert!(matches!(
            engine.set_field("name", FieldValue::text("x")),
            Err(WizardError::AlreadySubmitted { .. })
        ));
    }

    #[test]
    fn wizard_is_locked_on_the_final_step_while_submitting() {
        let (mut engine, _) = engine();
        reach_final_step(&mut engine);
        engine.set_field("terms_accepted", FieldValue::Flag(true)).expect("terms");
        let answers = engine.fields().clone();

        engine.begin_submission().expect("submission starts");

        assert_eq!(engine.go_previous(), NavigationOutcome::Stayed { step: 3 });
        assert_eq!(engine.go_next(), NavigationOutcome::Stayed { step: 3 });
        assert!(matches!(
            engine.set_field("name", FieldValue::text("Changed")),
            Err(WizardError::SubmissionInFlight { .. })
        ));
        assert!(matches!(
            engine.add_attachment("documents", Attachment::new("late.pdf", 10)),
            Err(WizardError::SubmissionInFlight { .. })
        ));
        assert!(matches!(
            engine.remove_attachment("documents", 0),
            Err(WizardError::SubmissionInFlight { .. })
        ));
        assert_eq!(engine.fields(), &answers);

        let error = engine
            .finish_submission(Err(crate::errors::ApplicationError::Integration("timeout".to_string())))
            .expect_err("delivery failed");
        assert!(matches!(error, SubmitError::Delivery(_)));
        assert_eq!(engine.current_step(), 3);
        assert!(engine.state().is_final_step());
        assert_eq!(engine.fields(), &answers);
        assert!(engine.set_field("name", FieldValue::text("Retry")).is_ok());
    }

    #[test]
    fn finishing_without_a_submission_in_flight_is_refused() {
        let (mut engine, _) = engine();
        reach_final_step(&mut engine);

        let receipt = crate::submission::SubmissionReceipt::new(uuid::Uuid::new_v4());
        assert_eq!(engine.finish_submission(Ok(receipt)), Err(SubmitError::NotSubmitting));
        assert!(!engine.state().is_completed());
        assert!(engine.set_field("terms_accepted", FieldValue::Flag(true)).is_ok());
    }

    #[tokio::test]
    async fn failed_delivery_keeps_answers_for_manual_retry() {
        let (mut engine, sink) = engine();
        let submitter = InMemorySubmitter::failing("crm unavailable");
        reach_final_step(&mut engine);
        engine.set_field("terms_accepted", FieldValue::Flag(true)).expect("terms");
        let answers = engine.fields().clone();

        let error = engine.submit(&submitter).await.expect_err("collaborator fails");
        assert!(matches!(error, SubmitError::Delivery(_)));
        assert!(!engine.is_submitting());
        assert_eq!(engine.current_step(), 3);
        assert_eq!(engine.fields(), &answers);

        submitter.set_failure(None);
        let receipt = engine.submit(&submitter).await.expect("retry succeeds");
        let payloads = submitter.payloads();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1].reference, receipt.reference);
        assert_eq!(payloads[1].simulation.as_ref().map(|estimate| estimate.reimbursement_rate), Some(85));
        assert!(sink.event_types().contains(&"wizard.submission_failed".to_string()));
        assert!(sink.event_types().contains(&"wizard.submission_succeeded".to_string()));
    }

    #[test]
    fn options_come_from_the_catalog() {
        let (engine, _) = engine();
        assert_eq!(engine.options_for("coverage_tier").len(), 3);
        assert!(engine.options_for("name").is_empty());
    }
}
