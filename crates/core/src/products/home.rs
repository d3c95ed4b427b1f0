//! Multirisk home (MRH) request.

use crate::catalog::CatalogList;
use crate::domain::product::ProductKind;
use crate::wizard::spec::{FieldRule, FieldSchema, SpecError, StepDefinition, StepSpecification};

use super::{
    confirmation_fields, contact_fields, contact_rules, terms_rule, CITY, DOCUMENTS, EMAIL,
    FIRST_NAME, LAST_NAME, MESSAGE, PHONE, TERMS_ACCEPTED,
};

pub const PROPERTY_TYPE: &str = "property_type";
pub const OCCUPANCY: &str = "occupancy";
pub const PROPERTY_CITY: &str = "property_city";
pub const SURFACE: &str = "surface_m2";
pub const ROOMS: &str = "rooms";
pub const CONSTRUCTION_YEAR: &str = "construction_year";
pub const COVERAGES: &str = "coverages";
pub const SHOW_OPTIONAL_COVERAGES: &str = "show_optional_coverages";
pub const CONTENT_VALUE: &str = "content_value";

/// Guarantees every MRH contract carries, whatever the optional picks.
pub const MANDATORY_COVERAGES: [&str; 3] = ["fire", "water_damage", "civil_liability"];

pub fn specification() -> Result<StepSpecification, SpecError> {
    let builder = StepSpecification::builder(ProductKind::Home)
        .field(FieldSchema::choice(PROPERTY_TYPE, "Property type", CatalogList::PropertyTypes))
        .field(FieldSchema::choice(OCCUPANCY, "You are", CatalogList::Occupancy))
        .field(FieldSchema::choice(PROPERTY_CITY, "Property location", CatalogList::Cities))
        .field(FieldSchema::number(SURFACE, "Surface (m2)"))
        .field(FieldSchema::number(ROOMS, "Number of rooms"))
        .field(FieldSchema::number(CONSTRUCTION_YEAR, "Construction year"))
        .field(FieldSchema::multi_choice(COVERAGES, "Coverages", CatalogList::HomeCoverages))
        .field(FieldSchema::flag(SHOW_OPTIONAL_COVERAGES, "Show optional coverages").transient())
        .field(FieldSchema::number(CONTENT_VALUE, "Value of the contents (MAD)"));

    confirmation_fields(contact_fields(builder))
        .step(property_step())
        .step(coverage_step())
        .step(contact_step())
        .build()
}

fn property_step() -> StepDefinition {
    StepDefinition::new("Property")
        .renders(&[PROPERTY_TYPE, OCCUPANCY, PROPERTY_CITY, SURFACE, ROOMS, CONSTRUCTION_YEAR])
        .rule(
            FieldRule::new(PROPERTY_TYPE)
                .required("Property type is required")
                .one_of(CatalogList::PropertyTypes, "Unknown property type"),
        )
        .rule(
            FieldRule::new(OCCUPANCY)
                .required("Tell us whether you own or rent")
                .one_of(CatalogList::Occupancy, "Unknown occupancy"),
        )
        .rule(
            FieldRule::new(PROPERTY_CITY)
                .required("Property location is required")
                .one_of(CatalogList::Cities, "Pick a city from the list"),
        )
        .rule(
            FieldRule::new(SURFACE)
                .required("Surface is required")
                .range(10, 2000, "Surface must be between 10 and 2000 m2"),
        )
        .rule(
            FieldRule::new(ROOMS)
                .required("Number of rooms is required")
                .range(1, 20, "Number of rooms must be between 1 and 20"),
        )
        .rule(FieldRule::new(CONSTRUCTION_YEAR).year_range(1900, 0, "Invalid construction year"))
}

fn coverage_step() -> StepDefinition {
    StepDefinition::new("Coverages")
        .renders(&[COVERAGES, SHOW_OPTIONAL_COVERAGES, CONTENT_VALUE])
        .rule(
            FieldRule::new(COVERAGES)
                .must_include(
                    &MANDATORY_COVERAGES,
                    "Fire, water damage and civil liability are mandatory",
                )
                .one_of(CatalogList::HomeCoverages, "Unknown coverage"),
        )
        .rule(FieldRule::new(CONTENT_VALUE).range(0, 10_000_000, "Invalid contents value"))
}

fn contact_step() -> StepDefinition {
    contact_rules()
        .into_iter()
        .fold(
            StepDefinition::new("Contact and confirmation")
                .renders(&[LAST_NAME, FIRST_NAME, EMAIL, PHONE, CITY, MESSAGE, DOCUMENTS, TERMS_ACCEPTED]),
            StepDefinition::rule,
        )
        .rule(FieldRule::new(DOCUMENTS).attachment_limits())
        .rule(terms_rule())
}
