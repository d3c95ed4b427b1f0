//! Motor "new business" request, with and without the driver-history step.

use crate::catalog::CatalogList;
use crate::domain::product::ProductKind;
use crate::wizard::spec::{
    Branch, Condition, FieldRule, FieldSchema, SpecError, StepDefinition, StepSpecification,
    StepSpecificationBuilder,
};

use super::{
    confirmation_fields, contact_fields, contact_rules, terms_rule, CITY, DOCUMENTS, EMAIL,
    FIRST_NAME, LAST_NAME, MESSAGE, PHONE, TERMS_ACCEPTED,
};

pub const INSURANCE_TYPE: &str = "insurance_type";
pub const INSURANCE_TYPE_OTHER: &str = "insurance_type_other";
pub const VEHICLE_BRAND: &str = "vehicle_brand";
pub const VEHICLE_MODEL: &str = "vehicle_model";
pub const VEHICLE_YEAR: &str = "vehicle_year";
pub const LICENSE_YEAR: &str = "license_year";
pub const HAS_CLAIMS: &str = "has_claims";
pub const CLAIMS_DETAILS: &str = "claims_details";

const OTHER_INSURANCE_TYPE: &str = "other";
const FIRST_VEHICLE_YEAR: i32 = 1980;
const FIRST_LICENSE_YEAR: i32 = 1950;

pub fn specification() -> Result<StepSpecification, SpecError> {
    base_fields(StepSpecification::builder(ProductKind::NewBusiness))
        .step(personal_step())
        .step(vehicle_step())
        .step(confirmation_step())
        .build()
}

pub fn with_driver_history() -> Result<StepSpecification, SpecError> {
    base_fields(StepSpecification::builder(ProductKind::NewBusinessWithHistory))
        .field(FieldSchema::number(LICENSE_YEAR, "Year the licence was obtained"))
        .field(FieldSchema::choice(HAS_CLAIMS, "Claims in the last 3 years", CatalogList::YesNo))
        .field(FieldSchema::text(CLAIMS_DETAILS, "Claims details"))
        .step(personal_step())
        .step(vehicle_step())
        .step(driver_history_step())
        .step(confirmation_step())
        .build()
}

fn base_fields(builder: StepSpecificationBuilder) -> StepSpecificationBuilder {
    let builder = contact_fields(builder)
        .field(FieldSchema::choice(INSURANCE_TYPE, "Insurance type", CatalogList::InsuranceTypes))
        .field(FieldSchema::text(INSURANCE_TYPE_OTHER, "Which insurance?"))
        .field(FieldSchema::choice(VEHICLE_BRAND, "Brand", CatalogList::VehicleBrands))
        .field(FieldSchema::text(VEHICLE_MODEL, "Model"))
        .field(FieldSchema::number(VEHICLE_YEAR, "Year of first registration"));
    confirmation_fields(builder)
}

fn personal_step() -> StepDefinition {
    contact_rules()
        .into_iter()
        .fold(
            StepDefinition::new("Personal information")
                .renders(&[LAST_NAME, FIRST_NAME, EMAIL, PHONE, CITY]),
            StepDefinition::rule,
        )
}

fn vehicle_step() -> StepDefinition {
    StepDefinition::new("Insurance and vehicle")
        .renders(&[INSURANCE_TYPE, INSURANCE_TYPE_OTHER, VEHICLE_BRAND, VEHICLE_MODEL, VEHICLE_YEAR])
        .rule(
            FieldRule::new(INSURANCE_TYPE)
                .required("Insurance type is required")
                .one_of(CatalogList::InsuranceTypes, "Unknown insurance type"),
        )
        .rule(
            FieldRule::new(VEHICLE_BRAND)
                .required("Brand is required")
                .one_of(CatalogList::VehicleBrands, "Unknown brand"),
        )
        .rule(FieldRule::new(VEHICLE_MODEL).required("Model is required"))
        .rule(
            FieldRule::new(VEHICLE_YEAR)
                .required("Vehicle year is required")
                .year_range(FIRST_VEHICLE_YEAR, 1, "Invalid vehicle year"),
        )
        .branch(
            Branch::when(Condition::equals(INSURANCE_TYPE, OTHER_INSURANCE_TYPE)).rule(
                FieldRule::new(INSURANCE_TYPE_OTHER).required("Please specify the insurance type"),
            ),
        )
}

fn driver_history_step() -> StepDefinition {
    StepDefinition::new("Driver history")
        .renders(&[LICENSE_YEAR, HAS_CLAIMS, CLAIMS_DETAILS])
        .rule(
            FieldRule::new(LICENSE_YEAR)
                .required("Licence year is required")
                .year_range(FIRST_LICENSE_YEAR, 0, "Invalid licence year"),
        )
        .rule(
            FieldRule::new(HAS_CLAIMS)
                .required("Tell us whether you had claims")
                .one_of(CatalogList::YesNo, "Answer yes or no"),
        )
        .branch(
            Branch::when(Condition::equals(HAS_CLAIMS, "yes"))
                .rule(FieldRule::new(CLAIMS_DETAILS).required("Describe your claims")),
        )
}

fn confirmation_step() -> StepDefinition {
    StepDefinition::new("Confirmation")
        .renders(&[MESSAGE, DOCUMENTS, TERMS_ACCEPTED])
        .rule(FieldRule::new(DOCUMENTS).attachment_limits())
        .rule(terms_rule())
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::domain::field::{FieldMap, FieldValue};
    use crate::wizard::state::FieldErrorKind;
    use crate::wizard::validation::{AttachmentLimits, ValidationContext};

    use super::*;

    fn validate(spec: &StepSpecification, step: usize, fields: &FieldMap) -> Vec<(String, FieldErrorKind)> {
        let catalog = Catalog::standard();
        let context = ValidationContext::new(&catalog, AttachmentLimits::default()).with_reference_year(2026);
        spec.step(step)
            .expect("step exists")
            .validate(fields, &context)
            .iter()
            .map(|(key, error)| (key.to_string(), error.kind))
            .collect()
    }

    fn vehicle_answers(spec: &StepSpecification) -> FieldMap {
        let mut fields = spec.initial_fields();
        fields.insert(INSURANCE_TYPE.to_string(), FieldValue::text("all_risks"));
        fields.insert(VEHICLE_BRAND.to_string(), FieldValue::text("dacia"));
        fields.insert(VEHICLE_MODEL.to_string(), FieldValue::text("Logan"));
        fields.insert(VEHICLE_YEAR.to_string(), FieldValue::number(2019));
        fields
    }

    #[test]
    fn vehicle_year_errors_land_on_the_rendered_key() {
        let spec = specification().expect("spec builds");
        let mut fields = vehicle_answers(&spec);
        fields.insert(VEHICLE_YEAR.to_string(), FieldValue::Empty);

        assert_eq!(validate(&spec, 2, &fields), vec![(VEHICLE_YEAR.to_string(), FieldErrorKind::Required)]);

        fields.insert(VEHICLE_YEAR.to_string(), FieldValue::number(2028));
        assert_eq!(validate(&spec, 2, &fields), vec![(VEHICLE_YEAR.to_string(), FieldErrorKind::OutOfRange)]);

        fields.insert(VEHICLE_YEAR.to_string(), FieldValue::number(2027));
        assert!(validate(&spec, 2, &fields).is_empty());
    }

    #[test]
    fn other_insurance_type_requires_clarification() {
        let spec = specification().expect("spec builds");
        let mut fields = vehicle_answers(&spec);
        fields.insert(INSURANCE_TYPE.to_string(), FieldValue::text("other"));

        assert_eq!(
            validate(&spec, 2, &fields),
            vec![(INSURANCE_TYPE_OTHER.to_string(), FieldErrorKind::ConditionallyRequired)]
        );

        fields.insert(INSURANCE_TYPE_OTHER.to_string(), FieldValue::text("Flotte"));
        assert!(validate(&spec, 2, &fields).is_empty());
    }

    #[test]
    fn driver_history_details_follow_the_claims_answer() {
        let spec = with_driver_history().expect("spec builds");
        assert_eq!(spec.step(3).map(|step| step.title.as_str()), Some("Driver history"));
        assert_eq!(spec.step(4).map(|step| step.title.as_str()), Some("Confirmation"));

        let mut fields = spec.initial_fields();
        fields.insert(LICENSE_YEAR.to_string(), FieldValue::number(2010));
        fields.insert(HAS_CLAIMS.to_string(), FieldValue::text("yes"));
        assert_eq!(
            validate(&spec, 3, &fields),
            vec![(CLAIMS_DETAILS.to_string(), FieldErrorKind::ConditionallyRequired)]
        );

        fields.insert(HAS_CLAIMS.to_string(), FieldValue::text("no"));
        assert!(validate(&spec, 3, &fields).is_empty());
    }

    #[test]
    fn licence_year_cannot_be_in_the_future() {
        let spec = with_driver_history().expect("spec builds");
        let mut fields = spec.initial_fields();
        fields.insert(LICENSE_YEAR.to_string(), FieldValue::number(2027));
        fields.insert(HAS_CLAIMS.to_string(), FieldValue::text("no"));

        assert_eq!(validate(&spec, 3, &fields), vec![(LICENSE_YEAR.to_string(), FieldErrorKind::OutOfRange)]);
    }

    #[test]
    fn confirmation_requires_terms() {
        let spec = specification().expect("spec builds");
        let fields = spec.initial_fields();

        assert_eq!(validate(&spec, 3, &fields), vec![(TERMS_ACCEPTED.to_string(), FieldErrorKind::NotAccepted)]);
    }
}
