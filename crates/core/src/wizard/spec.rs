use std::collections::{BTreeSet, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::catalog::CatalogList;
use crate::domain::field::{FieldKind, FieldMap};
use crate::domain::product::ProductKind;
use crate::simulation::PremiumEstimate;
use crate::wizard::state::FieldErrors;
use crate::wizard::validation::{validate_step, ValidationContext};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub options: Option<CatalogList>,
    /// UI-only fields are never part of the submitted payload.
    pub transient: bool,
}

impl FieldSchema {
    fn new(key: &str, label: &str, kind: FieldKind, options: Option<CatalogList>) -> Self {
        Self { key: key.to_string(), label: label.to_string(), kind, options, transient: false }
    }

    pub fn text(key: &str, label: &str) -> Self {
        Self::new(key, label, FieldKind::Text, None)
    }

    pub fn choice(key: &str, label: &str, options: CatalogList) -> Self {
        Self::new(key, label, FieldKind::Choice, Some(options))
    }

    pub fn number(key: &str, label: &str) -> Self {
        Self::new(key, label, FieldKind::Number, None)
    }

    pub fn flag(key: &str, label: &str) -> Self {
        Self::new(key, label, FieldKind::Flag, None)
    }

    pub fn multi_choice(key: &str, label: &str, options: CatalogList) -> Self {
        Self::new(key, label, FieldKind::MultiChoice, Some(options))
    }

    pub fn attachments(key: &str, label: &str) -> Self {
        Self::new(key, label, FieldKind::Attachments, None)
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Check {
    Required,
    Email,
    Phone,
    /// Inclusive numeric bounds.
    Range { min: Decimal, max: Decimal },
    /// Inclusive; the upper bound is the reference year plus `ahead`.
    YearRange { min: i32, ahead: i32 },
    OneOf(CatalogList),
    MinSelected(usize),
    MustInclude(BTreeSet<String>),
    Accepted,
    /// Size and count limits come from the engine configuration.
    AttachmentLimits,
}

impl Check {
    /// Presence checks run on blank values; format checks only on filled ones.
    pub(crate) fn applies_to_blank(&self) -> bool {
        matches!(
            self,
            Self::Required | Self::MinSelected(_) | Self::MustInclude(_) | Self::Accepted
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleCheck {
    pub check: Check,
    pub message: String,
}

/// Ordered checks for one field. The first failing check is reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRule {
    pub field: String,
    pub checks: Vec<RuleCheck>,
}

impl FieldRule {
    pub fn new(field: &str) -> Self {
        Self { field: field.to_string(), checks: Vec::new() }
    }

    fn push(mut self, check: Check, message: &str) -> Self {
        self.checks.push(RuleCheck { check, message: message.to_string() });
        self
    }

    pub fn required(self, message: &str) -> Self {
        self.push(Check::Required, message)
    }

    pub fn email(self, message: &str) -> Self {
        self.push(Check::Email, message)
    }

    pub fn phone(self, message: &str) -> Self {
        self.push(Check::Phone, message)
    }

    pub fn range(self, min: i64, max: i64, message: &str) -> Self {
        self.push(Check::Range { min: Decimal::from(min), max: Decimal::from(max) }, message)
    }

    pub fn year_range(self, min: i32, ahead: i32, message: &str) -> Self {
        self.push(Check::YearRange { min, ahead }, message)
    }

    pub fn one_of(self, list: CatalogList, message: &str) -> Self {
        self.push(Check::OneOf(list), message)
    }

    pub fn min_selected(self, min: usize, message: &str) -> Self {
        self.push(Check::MinSelected(min), message)
    }

    pub fn must_include(self, options: &[&str], message: &str) -> Self {
        let options = options.iter().map(|option| option.to_string()).collect();
        self.push(Check::MustInclude(options), message)
    }

    pub fn accepted(self, message: &str) -> Self {
        self.push(Check::Accepted, message)
    }

    pub fn attachment_limits(self) -> Self {
        self.push(Check::AttachmentLimits, "")
    }
}

/// Predicate over the accumulated answers that governs a branch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Equals { field: String, value: String },
    Includes { field: String, value: String },
}

impl Condition {
    pub fn equals(field: &str, value: &str) -> Self {
        Self::Equals { field: field.to_string(), value: value.to_string() }
    }

    pub fn includes(field: &str, value: &str) -> Self {
        Self::Includes { field: field.to_string(), value: value.to_string() }
    }

    pub fn governing_field(&self) -> &str {
        match self {
            Self::Equals { field, .. } | Self::Includes { field, .. } => field,
        }
    }

    pub fn holds(&self, fields: &FieldMap) -> bool {
        match self {
            Self::Equals { field, value } => fields
                .get(field)
                .and_then(|current| current.as_text())
                .is_some_and(|current| current.trim() == value),
            Self::Includes { field, value } => fields
                .get(field)
                .and_then(|current| current.as_selection())
                .is_some_and(|current| current.contains(value)),
        }
    }
}

/// Rules that only apply while their condition holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branch {
    pub condition: Condition,
    pub rules: Vec<FieldRule>,
}

impl Branch {
    pub fn when(condition: Condition) -> Self {
        Self { condition, rules: Vec::new() }
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepDefinition {
    pub title: String,
    pub fields: Vec<String>,
    pub rules: Vec<FieldRule>,
    pub branches: Vec<Branch>,
}

impl StepDefinition {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string(), fields: Vec::new(), rules: Vec::new(), branches: Vec::new() }
    }

    pub fn renders(mut self, keys: &[&str]) -> Self {
        self.fields.extend(keys.iter().map(|key| key.to_string()));
        self
    }

    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn validate(&self, fields: &FieldMap, context: &ValidationContext<'_>) -> FieldErrors {
        validate_step(self, fields, context)
    }
}

pub type SimulationFn = fn(&FieldMap) -> Option<PremiumEstimate>;

/// Derived estimate shown on `display_step`, recomputed from `inputs`.
#[derive(Clone, Debug)]
pub struct SimulationHook {
    pub display_step: usize,
    pub inputs: Vec<String>,
    pub compute: SimulationFn,
}

impl SimulationHook {
    pub fn new(display_step: usize, inputs: &[&str], compute: SimulationFn) -> Self {
        Self { display_step, inputs: inputs.iter().map(|key| key.to_string()).collect(), compute }
    }

    pub fn is_input(&self, key: &str) -> bool {
        self.inputs.iter().any(|input| input == key)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("{product} wizard declares no steps")]
    NoSteps { product: ProductKind },
    #[error("field `{key}` is declared more than once")]
    DuplicateField { key: String },
    #[error("step {step} references undeclared field `{key}`")]
    UnknownField { step: usize, key: String },
    #[error("step {step} branches on undeclared field `{key}`")]
    UnknownGoverningField { step: usize, key: String },
    #[error("simulation references undeclared input `{key}`")]
    UnknownSimulationInput { key: String },
    #[error("simulation display step {step} is outside 1..={total}")]
    SimulationStepOutOfRange { step: usize, total: usize },
}

/// Immutable description of one product wizard.
#[derive(Clone, Debug)]
pub struct StepSpecification {
    product: ProductKind,
    schema: Vec<FieldSchema>,
    steps: Vec<StepDefinition>,
    simulation: Option<SimulationHook>,
}

impl StepSpecification {
    pub fn builder(product: ProductKind) -> StepSpecificationBuilder {
        StepSpecificationBuilder { product, schema: Vec::new(), steps: Vec::new(), simulation: None }
    }

    pub fn product(&self) -> ProductKind {
        self.product
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// 1-indexed step lookup.
    pub fn step(&self, number: usize) -> Option<&StepDefinition> {
        number.checked_sub(1).and_then(|index| self.steps.get(index))
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn schema(&self) -> &[FieldSchema] {
        &self.schema
    }

    pub fn field(&self, key: &str) -> Option<&FieldSchema> {
        self.schema.iter().find(|field| field.key == key)
    }

    pub fn simulation(&self) -> Option<&SimulationHook> {
        self.simulation.as_ref()
    }

    pub fn initial_fields(&self) -> FieldMap {
        self.schema.iter().map(|field| (field.key.clone(), field.kind.default_value())).collect()
    }
}

pub struct StepSpecificationBuilder {
    product: ProductKind,
    schema: Vec<FieldSchema>,
    steps: Vec<StepDefinition>,
    simulation: Option<SimulationHook>,
}

impl StepSpecificationBuilder {
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.schema.push(field);
        self
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn simulation(mut self, hook: SimulationHook) -> Self {
        self.simulation = Some(hook);
        self
    }

    pub fn build(self) -> Result<StepSpecification, SpecError> {
        if self.steps.is_empty() {
            return Err(SpecError::NoSteps { product: self.product });
        }

        let mut declared = HashSet::new();
        for field in &self.schema {
            if !declared.insert(field.key.as_str()) {
                return Err(SpecError::DuplicateField { key: field.key.clone() });
            }
        }

        for (index, step) in self.steps.iter().enumerate() {
            let number = index + 1;
            let unknown = |key: &String| SpecError::UnknownField { step: number, key: key.clone() };

            if let Some(key) = step.fields.iter().find(|key| !declared.contains(key.as_str())) {
                return Err(unknown(key));
            }

            let branch_rules = step.branches.iter().flat_map(|branch| branch.rules.iter());
            if let Some(rule) =
                step.rules.iter().chain(branch_rules).find(|rule| !declared.contains(rule.field.as_str()))
            {
                return Err(unknown(&rule.field));
            }

            if let Some(branch) = step
                .branches
                .iter()
                .find(|branch| !declared.contains(branch.condition.governing_field()))
            {
                return Err(SpecError::UnknownGoverningField {
                    step: number,
                    key: branch.condition.governing_field().to_string(),
                });
            }
        }

        if let Some(hook) = &self.simulation {
            if hook.display_step == 0 || hook.display_step > self.steps.len() {
                return Err(SpecError::SimulationStepOutOfRange {
                    step: hook.display_step,
                    total: self.steps.len(),
                });
            }
            if let Some(key) = hook.inputs.iter().find(|key| !declared.contains(key.as_str())) {
                return Err(SpecError::UnknownSimulationInput { key: key.clone() });
            }
        }

        Ok(StepSpecification {
            product: self.product,
            schema: self.schema,
            steps: self.steps,
            simulation: self.simulation,
        })
    }
}
