//! Sehassur health request with the monthly premium simulation.

use crate::catalog::CatalogList;
use crate::domain::product::ProductKind;
use crate::simulation::{estimate_from_fields, AGE_FIELD, COVERAGES_FIELD, TIER_FIELD};
use crate::wizard::spec::{
    FieldRule, FieldSchema, SimulationHook, SpecError, StepDefinition, StepSpecification,
};

use super::{
    confirmation_fields, contact_fields, contact_rules, terms_rule, CITY, DOCUMENTS, EMAIL,
    FIRST_NAME, LAST_NAME, MESSAGE, PHONE, TERMS_ACCEPTED,
};

pub const AGE: &str = AGE_FIELD;
pub const FAMILY_STATUS: &str = "family_status";
pub const DEPENDENTS: &str = "dependents";
pub const PROFESSION: &str = "profession";
pub const COVERAGES: &str = COVERAGES_FIELD;
pub const COVERAGE_TIER: &str = TIER_FIELD;

pub const SIMULATION_STEP: usize = 3;

pub fn specification() -> Result<StepSpecification, SpecError> {
    let builder = StepSpecification::builder(ProductKind::Health)
        .field(FieldSchema::number(AGE, "Age"))
        .field(FieldSchema::choice(FAMILY_STATUS, "Family status", CatalogList::FamilyStatus))
        .field(FieldSchema::number(DEPENDENTS, "Dependents"))
        .field(FieldSchema::text(PROFESSION, "Profession"))
        .field(FieldSchema::multi_choice(COVERAGES, "Coverages", CatalogList::HealthCoverages))
        .field(FieldSchema::choice(COVERAGE_TIER, "Coverage level", CatalogList::CoverageTiers));

    confirmation_fields(contact_fields(builder))
        .step(profile_step())
        .step(needs_step())
        .step(contact_step())
        .simulation(SimulationHook::new(
            SIMULATION_STEP,
            &[AGE, COVERAGE_TIER, COVERAGES],
            estimate_from_fields,
        ))
        .build()
}

fn profile_step() -> StepDefinition {
    StepDefinition::new("Profile")
        .renders(&[AGE, FAMILY_STATUS, DEPENDENTS, PROFESSION])
        .rule(
            FieldRule::new(AGE)
                .required("Age is required")
                .range(18, 80, "Age must be between 18 and 80"),
        )
        .rule(
            FieldRule::new(FAMILY_STATUS)
                .required("Family status is required")
                .one_of(CatalogList::FamilyStatus, "Unknown family status"),
        )
        .rule(FieldRule::new(DEPENDENTS).range(0, 10, "Dependents must be between 0 and 10"))
}

fn needs_step() -> StepDefinition {
    StepDefinition::new("Needs")
        .renders(&[COVERAGES, COVERAGE_TIER])
        .rule(
            FieldRule::new(COVERAGES)
                .min_selected(1, "Select at least one coverage")
                .one_of(CatalogList::HealthCoverages, "Unknown coverage"),
        )
        .rule(
            FieldRule::new(COVERAGE_TIER)
                .required("Pick a coverage level")
                .one_of(CatalogList::CoverageTiers, "Unknown coverage level"),
        )
}

fn contact_step() -> StepDefinition {
    contact_rules()
        .into_iter()
        .fold(
            StepDefinition::new("Contact and simulation")
                .renders(&[LAST_NAME, FIRST_NAME, EMAIL, PHONE, CITY, MESSAGE, DOCUMENTS, TERMS_ACCEPTED]),
            StepDefinition::rule,
        )
        .rule(FieldRule::new(DOCUMENTS).attachment_limits())
        .rule(terms_rule())
}
