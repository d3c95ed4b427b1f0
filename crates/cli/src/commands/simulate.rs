use std::collections::BTreeSet;

use courtier_core::simulation::{simulate_health_premium, CoverageTier, PremiumEstimate, SimulationInput};
use courtier_core::{Catalog, CatalogList};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct SimulationReport {
    command: &'static str,
    status: &'static str,
    input: SimulationInput,
    estimate: PremiumEstimate,
}

pub fn run(age: u32, tier: &str, coverages: &[String]) -> CommandResult {
    let tier = match tier.parse::<CoverageTier>() {
        Ok(tier) => tier,
        Err(error) => return CommandResult::failure("simulate", "invalid_input", error.to_string(), 4),
    };

    let catalog = Catalog::standard();
    let selected: BTreeSet<&str> =
        coverages.iter().map(|coverage| coverage.trim()).filter(|coverage| !coverage.is_empty()).collect();
    if let Some(unknown) = selected.iter().find(|id| !catalog.contains(CatalogList::HealthCoverages, id)) {
        return CommandResult::failure(
            "simulate",
            "invalid_input",
            format!("unknown health coverage `{unknown}`"),
            4,
        );
    }

    let input = SimulationInput { age, tier, selected_coverage_count: selected.len() };
    let estimate = simulate_health_premium(&input);
    tracing::debug!(
        event_name = "cli.simulate.completed",
        age,
        tier = %tier,
        coverages = selected.len(),
        monthly_premium = %estimate.monthly_premium,
        "premium simulated"
    );

    CommandResult::report(&SimulationReport { command: "simulate", status: "ok", input, estimate }, 0)
}
