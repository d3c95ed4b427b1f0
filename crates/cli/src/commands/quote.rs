use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use courtier_core::audit::{AuditContext, TracingAuditSink};
use courtier_core::config::{AppConfig, LoadOptions};
use courtier_core::errors::{ApplicationError, DomainError};
use courtier_core::products;
use courtier_core::{
    AttachmentOutcome, FieldErrors, PremiumEstimate, ProductKind, SubmitError, WizardEngine,
    WizardError,
};
use serde::Serialize;

use crate::answers::{Answer, Answers};
use crate::commands::CommandResult;
use crate::outbox::OutboxSubmitter;

#[derive(Debug, Serialize)]
struct RefusedReport {
    command: &'static str,
    status: &'static str,
    product: ProductKind,
    step: usize,
    title: String,
    errors: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SubmittedReport {
    command: &'static str,
    status: &'static str,
    product: ProductKind,
    wizard_id: String,
    reference: String,
    location: Option<String>,
    steps: usize,
    simulation: Option<PremiumEstimate>,
}

pub fn run(options: &LoadOptions, product: &str, answers_path: &Path) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let product = match product.parse::<ProductKind>() {
        Ok(product) => product,
        Err(error) => return CommandResult::failure("quote", "invalid_input", error.to_string(), 4),
    };
    let spec = match products::specification(product) {
        Ok(spec) => Arc::new(spec),
        Err(error) => {
            let error = ApplicationError::from(DomainError::from(error));
            return CommandResult::interface_failure("quote", error, product.slug(), 2);
        }
    };
    let catalog = match config.load_catalog() {
        Ok(catalog) => Arc::new(catalog),
        Err(error) => return CommandResult::failure("quote", "catalog", error.to_string(), 2),
    };
    let answers = match Answers::load(answers_path, &spec) {
        Ok(answers) => answers,
        Err(error) => return CommandResult::failure("quote", "invalid_input", format!("{error:#}"), 4),
    };

    let mut engine = WizardEngine::new(spec, catalog).with_limits(config.attachment_limits());
    if let Some(year) = config.wizard.reference_year {
        engine = engine.with_reference_year(year);
    }
    let context = AuditContext::new(engine.id().clone(), engine.id().to_string(), "courtier-cli");
    engine = engine.with_audit(Arc::new(TracingAuditSink), context);

    loop {
        if let Err(result) = apply_step_answers(&mut engine, &answers) {
            return result;
        }
        if engine.state().is_final_step() {
            break;
        }
        let outcome = engine.go_next();
        if outcome.is_refused() {
            return refused(&engine, engine.errors());
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "quote",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let submitter = OutboxSubmitter::new(config.submission.outbox_dir.clone());
    match runtime.block_on(engine.submit(&submitter)) {
        Ok(receipt) => CommandResult::report(
            &SubmittedReport {
                command: "quote",
                status: "submitted",
                product,
                wizard_id: engine.id().to_string(),
                reference: receipt.reference.to_string(),
                location: receipt.location,
                steps: engine.total_steps(),
                simulation: engine.simulation().cloned(),
            },
            0,
        ),
        Err(SubmitError::Validation { errors }) => refused(&engine, &errors),
        Err(SubmitError::Delivery(error)) => {
            CommandResult::interface_failure("quote", error, &engine.id().to_string(), 5)
        }
        Err(error) => CommandResult::failure("quote", "submission", error.to_string(), 5),
    }
}

/// Applies the answers of every field the current step renders.
fn apply_step_answers(engine: &mut WizardEngine, answers: &Answers) -> Result<(), CommandResult> {
    let keys = engine.current_step_definition().map(|step| step.fields.clone()).unwrap_or_default();

    for key in keys {
        let Some(answer) = answers.get(&key) else {
            continue;
        };

        match answer {
            Answer::Value(value) => {
                engine
                    .set_field(&key, value.clone())
                    .map_err(|error| wizard_failure(engine.id().to_string(), error))?;
            }
            Answer::Files(files) => {
                for file in files {
                    let outcome = engine
                        .add_attachment(&key, file.clone())
                        .map_err(|error| wizard_failure(engine.id().to_string(), error))?;
                    if let AttachmentOutcome::Rejected(_) = outcome {
                        return Err(refused(&*engine, engine.errors()));
                    }
                }
            }
        }
    }

    Ok(())
}

fn wizard_failure(wizard_id: String, error: WizardError) -> CommandResult {
    let error = ApplicationError::from(DomainError::from(error));
    CommandResult::interface_failure("quote", error, &wizard_id, 4)
}

fn refused(engine: &WizardEngine, errors: &FieldErrors) -> CommandResult {
    let step = engine.current_step();
    CommandResult::report(
        &RefusedReport {
            command: "quote",
            status: "refused",
            product: engine.product(),
            step,
            title: engine.current_step_definition().map(|step| step.title.clone()).unwrap_or_default(),
            errors: errors.messages(),
        },
        1,
    )
}
