//! Step specifications of the products offered through the wizard.

pub mod health;
pub mod home;
pub mod new_business;

use crate::catalog::CatalogList;
use crate::domain::product::ProductKind;
use crate::wizard::spec::{FieldRule, FieldSchema, SpecError, StepSpecification, StepSpecificationBuilder};

pub const LAST_NAME: &str = "last_name";
pub const FIRST_NAME: &str = "first_name";
pub const EMAIL: &str = "email";
pub const PHONE: &str = "phone";
pub const CITY: &str = "city";
pub const MESSAGE: &str = "message";
pub const DOCUMENTS: &str = "documents";
pub const TERMS_ACCEPTED: &str = "terms_accepted";

pub fn specification(product: ProductKind) -> Result<StepSpecification, SpecError> {
    match product {
        ProductKind::NewBusiness => new_business::specification(),
        ProductKind::NewBusinessWithHistory => new_business::with_driver_history(),
        ProductKind::Home => home::specification(),
        ProductKind::Health => health::specification(),
    }
}

/// Declares the identity and contact fields shared by every product.
pub(crate) fn contact_fields(builder: StepSpecificationBuilder) -> StepSpecificationBuilder {
    builder
        .field(FieldSchema::text(LAST_NAME, "Last name"))
        .field(FieldSchema::text(FIRST_NAME, "First name"))
        .field(FieldSchema::text(EMAIL, "Email"))
        .field(FieldSchema::text(PHONE, "Phone"))
        .field(FieldSchema::choice(CITY, "City", CatalogList::Cities))
}

/// Declares the free message, supporting documents and terms acceptance.
pub(crate) fn confirmation_fields(builder: StepSpecificationBuilder) -> StepSpecificationBuilder {
    builder
        .field(FieldSchema::text(MESSAGE, "Message"))
        .field(FieldSchema::attachments(DOCUMENTS, "Supporting documents"))
        .field(FieldSchema::flag(TERMS_ACCEPTED, "I accept the terms and conditions"))
}

pub(crate) fn contact_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(LAST_NAME).required("Last name is required"),
        FieldRule::new(FIRST_NAME).required("First name is required"),
        FieldRule::new(EMAIL).required("Email is required").email("Invalid email address"),
        FieldRule::new(PHONE).required("Phone number is required").phone("Invalid phone number"),
        FieldRule::new(CITY)
            .required("City is required")
            .one_of(CatalogList::Cities, "Pick a city from the list"),
    ]
}

pub(crate) fn terms_rule() -> FieldRule {
    FieldRule::new(TERMS_ACCEPTED).accepted("You must accept the terms and conditions")
}
