use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::domain::field::{Attachment, FieldMap, FieldValue};
use crate::wizard::spec::{Check, FieldRule, StepDefinition};
use crate::wizard::state::{FieldError, FieldErrorKind, FieldErrors};

const MEBIBYTE: u64 = 1024 * 1024;

pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * MEBIBYTE;
pub const DEFAULT_MAX_ATTACHMENTS_PER_FIELD: usize = 5;

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
static PHONE_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn matches_pattern(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|regex| regex.is_match(value.trim()))
}

fn is_email(value: &str) -> bool {
    matches_pattern(&EMAIL_PATTERN, r"^[^\s@]+@[^\s@]+\.[^\s@]+$", value)
}

fn is_phone(value: &str) -> bool {
    matches_pattern(&PHONE_PATTERN, r"^\+?[0-9][0-9 .\-]{7,16}[0-9]$", value)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentLimits {
    /// Inclusive per-file size limit.
    pub max_bytes: u64,
    pub max_files: usize,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES, max_files: DEFAULT_MAX_ATTACHMENTS_PER_FIELD }
    }
}

impl AttachmentLimits {
    fn size_label(&self) -> String {
        if self.max_bytes % MEBIBYTE == 0 {
            format!("{} MB", self.max_bytes / MEBIBYTE)
        } else {
            format!("{} bytes", self.max_bytes)
        }
    }

    pub fn too_large(&self, name: &str) -> FieldError {
        FieldError::new(
            FieldErrorKind::AttachmentTooLarge,
            format!("The file \"{name}\" exceeds the {} limit", self.size_label()),
        )
    }

    pub fn too_many(&self) -> FieldError {
        FieldError::new(
            FieldErrorKind::TooManyAttachments,
            format!("At most {} files can be attached", self.max_files),
        )
    }

    /// Checks a file about to be appended to `current`.
    pub fn check_candidate(&self, current: &[Attachment], candidate: &Attachment) -> Option<FieldError> {
        if candidate.size_bytes > self.max_bytes {
            return Some(self.too_large(&candidate.name));
        }
        if current.len() >= self.max_files {
            return Some(self.too_many());
        }
        None
    }

    pub fn check_all(&self, items: &[Attachment]) -> Option<FieldError> {
        if let Some(item) = items.iter().find(|item| item.size_bytes > self.max_bytes) {
            return Some(self.too_large(&item.name));
        }
        if items.len() > self.max_files {
            return Some(self.too_many());
        }
        None
    }
}

/// Read-only collaborators a step validator may consult.
#[derive(Clone, Copy, Debug)]
pub struct ValidationContext<'a> {
    pub catalog: &'a Catalog,
    pub limits: AttachmentLimits,
    pub reference_year: i32,
}

impl<'a> ValidationContext<'a> {
    pub fn new(catalog: &'a Catalog, limits: AttachmentLimits) -> Self {
        Self { catalog, limits, reference_year: Utc::now().year() }
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }
}

/// Runs every rule of `step`, plus the rules of branches whose condition holds.
///
/// All offending fields are reported together; within one field the first
/// failing check wins.
pub fn validate_step(step: &StepDefinition, fields: &FieldMap, context: &ValidationContext<'_>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    for rule in &step.rules {
        if let Some(error) = evaluate_rule(rule, fields, context, false) {
            errors.insert(rule.field.clone(), error);
        }
    }

    for branch in step.branches.iter().filter(|branch| branch.condition.holds(fields)) {
        for rule in &branch.rules {
            if errors.contains(&rule.field) {
                continue;
            }
            if let Some(error) = evaluate_rule(rule, fields, context, true) {
                errors.insert(rule.field.clone(), error);
            }
        }
    }

    errors
}

fn evaluate_rule(
    rule: &FieldRule,
    fields: &FieldMap,
    context: &ValidationContext<'_>,
    conditional: bool,
) -> Option<FieldError> {
    let empty = FieldValue::Empty;
    let value = fields.get(&rule.field).unwrap_or(&empty);
    let blank = value.is_blank();

    for rule_check in &rule.checks {
        if blank && !rule_check.check.applies_to_blank() {
            continue;
        }

        if let Check::AttachmentLimits = rule_check.check {
            let items = value.as_attachments().unwrap_or(&[]);
            if let Some(error) = context.limits.check_all(items) {
                return Some(error);
            }
            continue;
        }

        if let Err(kind) = run_check(&rule_check.check, value, context) {
            let kind = match kind {
                FieldErrorKind::Required if conditional => FieldErrorKind::ConditionallyRequired,
                other => other,
            };
            return Some(FieldError::new(kind, rule_check.message.clone()));
        }
    }

    None
}

fn run_check(check: &Check, value: &FieldValue, context: &ValidationContext<'_>) -> Result<(), FieldErrorKind> {
    match check {
        Check::Required => {
            if value.is_blank() {
                return Err(FieldErrorKind::Required);
            }
        }
        Check::Email => {
            if !value.as_text().is_some_and(is_email) {
                return Err(FieldErrorKind::InvalidFormat);
            }
        }
        Check::Phone => {
            if !value.as_text().is_some_and(is_phone) {
                return Err(FieldErrorKind::InvalidFormat);
            }
        }
        Check::Range { min, max } => {
            let number = value.as_number().ok_or(FieldErrorKind::InvalidFormat)?;
            if number < *min || number > *max {
                return Err(FieldErrorKind::OutOfRange);
            }
        }
        Check::YearRange { min, ahead } => {
            let year = value.as_number().ok_or(FieldErrorKind::InvalidFormat)?;
            if !year.fract().is_zero() {
                return Err(FieldErrorKind::InvalidFormat);
            }
            let lower = Decimal::from(*min);
            let upper = Decimal::from(context.reference_year + ahead);
            if year < lower || year > upper {
                return Err(FieldErrorKind::OutOfRange);
            }
        }
        Check::OneOf(list) => {
            let known = match value {
                FieldValue::Text(id) => context.catalog.contains(*list, id.trim()),
                FieldValue::Selection(ids) => ids.iter().all(|id| context.catalog.contains(*list, id)),
                _ => false,
            };
            if !known {
                return Err(FieldErrorKind::NotInCatalog);
            }
        }
        Check::MinSelected(min) => {
            let count = value.as_selection().map(|ids| ids.len()).unwrap_or(0);
            if count < *min {
                return Err(FieldErrorKind::Required);
            }
        }
        Check::MustInclude(mandatory) => {
            let selected = value.as_selection();
            let complete =
                mandatory.iter().all(|option| selected.is_some_and(|ids| ids.contains(option)));
            if !complete {
                return Err(FieldErrorKind::MandatoryOptionMissing);
            }
        }
        Check::Accepted => {
            if value.as_flag() != Some(true) {
                return Err(FieldErrorKind::NotAccepted);
            }
        }
        Check::AttachmentLimits => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::catalog::{Catalog, CatalogList};
    use crate::domain::field::{Attachment, FieldMap, FieldValue};
    use crate::wizard::spec::{Branch, Condition, FieldRule, StepDefinition};
    use crate::wizard::state::FieldErrorKind;

    use super::{validate_step, AttachmentLimits, ValidationContext, DEFAULT_MAX_ATTACHMENT_BYTES};

    fn context(catalog: &Catalog) -> ValidationContext<'_> {
        ValidationContext::new(catalog, AttachmentLimits::default()).with_reference_year(2026)
    }

    fn fields(entries: &[(&str, FieldValue)]) -> FieldMap {
        entries.iter().map(|(key, value)| (key.to_string(), value.clone())).collect()
    }

    #[test]
    fn empty_and_malformed_email_have_distinct_messages() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Contact").rule(
            FieldRule::new("email").required("Email is required").email("Email address is invalid"),
        );

        let missing = validate_step(&step, &fields(&[("email", FieldValue::text(" "))]), &context(&catalog));
        let missing = missing.get("email").expect("missing email reported");
        assert_eq!(missing.kind, FieldErrorKind::Required);
        assert_eq!(missing.message, "Email is required");

        let malformed =
            validate_step(&step, &fields(&[("email", FieldValue::text("jane@"))]), &context(&catalog));
        let malformed = malformed.get("email").expect("malformed email reported");
        assert_eq!(malformed.kind, FieldErrorKind::InvalidFormat);
        assert_eq!(malformed.message, "Email address is invalid");

        let valid = validate_step(
            &step,
            &fields(&[("email", FieldValue::text("jane.doe@example.ma"))]),
            &context(&catalog),
        );
        assert!(valid.is_empty());
    }

    #[test]
    fn every_invalid_field_is_reported_at_once() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Profile")
            .rule(FieldRule::new("age").required("Age is required").range(18, 80, "Age out of range"))
            .rule(FieldRule::new("city").required("City is required").one_of(CatalogList::Cities, "Unknown city"))
            .rule(FieldRule::new("phone").required("Phone is required").phone("Phone is invalid"));

        let errors = validate_step(
            &step,
            &fields(&[
                ("age", FieldValue::number(17)),
                ("city", FieldValue::text("atlantis")),
                ("phone", FieldValue::text("0612345678")),
            ]),
            &context(&catalog),
        );

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("age").map(|error| error.kind), Some(FieldErrorKind::OutOfRange));
        assert_eq!(errors.get("city").map(|error| error.kind), Some(FieldErrorKind::NotInCatalog));
        assert!(!errors.contains("phone"));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Profile").rule(FieldRule::new("age").range(18, 80, "Age out of range"));

        for (age, valid) in [(17, false), (18, true), (80, true), (81, false)] {
            let errors = validate_step(&step, &fields(&[("age", FieldValue::number(age))]), &context(&catalog));
            assert_eq!(errors.is_empty(), valid, "age {age}");
        }
    }

    #[test]
    fn year_range_tracks_reference_year() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Vehicle")
            .rule(FieldRule::new("vehicle_year").year_range(1980, 1, "Year out of range"));

        let at_bound = fields(&[("vehicle_year", FieldValue::number(2027))]);
        assert!(validate_step(&step, &at_bound, &context(&catalog)).is_empty());

        let past_bound = fields(&[("vehicle_year", FieldValue::number(2028))]);
        assert!(validate_step(&step, &past_bound, &context(&catalog)).contains("vehicle_year"));
        assert!(validate_step(&step, &past_bound, &context(&catalog).with_reference_year(2027)).is_empty());
    }

    #[test]
    fn optional_fields_skip_format_checks_when_blank() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Profile").rule(FieldRule::new("dependents").range(0, 10, "Too many"));

        let errors = validate_step(&step, &fields(&[("dependents", FieldValue::Empty)]), &context(&catalog));
        assert!(errors.is_empty());
    }

    #[test]
    fn branch_rules_only_apply_while_condition_holds() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("History").branch(
            Branch::when(Condition::equals("has_claims", "yes"))
                .rule(FieldRule::new("claims_details").required("Describe your claims")),
        );

        let inactive = fields(&[
            ("has_claims", FieldValue::text("no")),
            ("claims_details", FieldValue::text("")),
        ]);
        assert!(validate_step(&step, &inactive, &context(&catalog)).is_empty());

        let active = fields(&[
            ("has_claims", FieldValue::text("yes")),
            ("claims_details", FieldValue::text("")),
        ]);
        let errors = validate_step(&step, &active, &context(&catalog));
        assert_eq!(
            errors.get("claims_details").map(|error| error.kind),
            Some(FieldErrorKind::ConditionallyRequired)
        );
    }

    #[test]
    fn mandatory_options_ignore_optional_extras() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Coverage").rule(FieldRule::new("coverages").must_include(
            &["fire", "water_damage", "civil_liability"],
            "Mandatory coverages must stay selected",
        ));

        let partial = fields(&[("coverages", FieldValue::selection(["fire", "theft", "civil_liability"]))]);
        assert_eq!(
            validate_step(&step, &partial, &context(&catalog)).get("coverages").map(|error| error.kind),
            Some(FieldErrorKind::MandatoryOptionMissing)
        );

        let complete = fields(&[(
            "coverages",
            FieldValue::selection(["fire", "water_damage", "civil_liability", "glass_breakage"]),
        )]);
        assert!(validate_step(&step, &complete, &context(&catalog)).is_empty());
    }

    #[test]
    fn attachment_limits_are_checked_on_candidates_and_lists() {
        let limits = AttachmentLimits::default();
        let small = Attachment::new("permis.pdf", 4 * 1024 * 1024);
        let exact = Attachment::new("carte-grise.pdf", DEFAULT_MAX_ATTACHMENT_BYTES);
        let large = Attachment::new("scan.tiff", 6 * 1024 * 1024);

        assert!(limits.check_candidate(&[], &small).is_none());
        assert!(limits.check_candidate(&[], &exact).is_none());
        let rejected = limits.check_candidate(&[], &large).expect("too large");
        assert_eq!(rejected.kind, FieldErrorKind::AttachmentTooLarge);
        assert!(rejected.message.contains("5 MB"));

        let full = vec![small.clone(); limits.max_files];
        assert_eq!(
            limits.check_candidate(&full, &small).map(|error| error.kind),
            Some(FieldErrorKind::TooManyAttachments)
        );
        assert!(limits.check_all(&full).is_none());
        assert!(limits.check_all(&[small, large]).is_some());
    }

    #[test]
    fn consent_must_be_accepted() {
        let catalog = Catalog::standard();
        let step = StepDefinition::new("Confirm").rule(FieldRule::new("terms_accepted").accepted("Accept the terms"));

        let refused = validate_step(&step, &fields(&[("terms_accepted", FieldValue::Flag(false))]), &context(&catalog));
        assert_eq!(refused.get("terms_accepted").map(|error| error.kind), Some(FieldErrorKind::NotAccepted));

        let accepted = validate_step(&step, &fields(&[("terms_accepted", FieldValue::Flag(true))]), &context(&catalog));
        assert!(accepted.is_empty());
    }
}
