pub mod engine;
pub mod spec;
pub mod state;
pub mod validation;

pub use engine::{AttachmentOutcome, SubmitError, WizardEngine, WizardError};
pub use spec::{
    Branch, Check, Condition, FieldRule, FieldSchema, SimulationHook, SpecError, StepDefinition,
    StepSpecification,
};
pub use state::{FieldError, FieldErrorKind, FieldErrors, NavigationOutcome, WizardState};
pub use validation::{AttachmentLimits, ValidationContext};
