pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod products;
pub mod simulation;
pub mod submission;
pub mod wizard;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use catalog::{Catalog, CatalogList, CatalogOption};
pub use domain::field::{Attachment, FieldKind, FieldMap, FieldValue};
pub use domain::product::{ProductKind, WizardId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use simulation::{simulate_health_premium, CoverageTier, PremiumEstimate, SimulationInput};
pub use submission::{InMemorySubmitter, SubmissionPayload, SubmissionReceipt, Submitter};
pub use wizard::{
    AttachmentLimits, AttachmentOutcome, FieldError, FieldErrorKind, FieldErrors,
    NavigationOutcome, StepSpecification, SubmitError, WizardEngine, WizardError,
};
