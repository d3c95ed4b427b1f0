use courtier_core::domain::field::FieldKind;
use courtier_core::errors::{ApplicationError, DomainError};
use courtier_core::products;
use courtier_core::ProductKind;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ProductsReport {
    command: &'static str,
    status: &'static str,
    products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize)]
struct ProductSummary {
    slug: &'static str,
    name: &'static str,
    simulation_step: Option<usize>,
    steps: Vec<StepSummary>,
}

#[derive(Debug, Serialize)]
struct StepSummary {
    number: usize,
    title: String,
    fields: Vec<FieldSummary>,
}

#[derive(Debug, Serialize)]
struct FieldSummary {
    key: String,
    kind: FieldKind,
    options: Option<&'static str>,
}

pub fn run() -> CommandResult {
    let mut summaries = Vec::with_capacity(ProductKind::ALL.len());

    for product in ProductKind::ALL {
        let spec = match products::specification(product) {
            Ok(spec) => spec,
            Err(error) => {
                let error = ApplicationError::from(DomainError::from(error));
                return CommandResult::interface_failure("products", error, product.slug(), 2);
            }
        };

        let steps = spec
            .steps()
            .iter()
            .enumerate()
            .map(|(index, step)| StepSummary {
                number: index + 1,
                title: step.title.clone(),
                fields: step
                    .fields
                    .iter()
                    .filter_map(|key| spec.field(key))
                    .map(|field| FieldSummary {
                        key: field.key.clone(),
                        kind: field.kind,
                        options: field.options.map(|list| list.key()),
                    })
                    .collect(),
            })
            .collect();

        summaries.push(ProductSummary {
            slug: product.slug(),
            name: product.display_name(),
            simulation_step: spec.simulation().map(|hook| hook.display_step),
            steps,
        });
    }

    CommandResult::report(&ProductsReport { command: "products", status: "ok", products: summaries }, 0)
}
