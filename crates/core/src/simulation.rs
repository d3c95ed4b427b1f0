use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::field::FieldMap;
use crate::errors::DomainError;

const BASE_MONTHLY_PREMIUM: i64 = 200;
const PER_COVERAGE_INCREMENT: i64 = 50;
const ANNUAL_CAP_MONTHS: i64 = 12 * 3;

pub const AGE_FIELD: &str = "age";
pub const TIER_FIELD: &str = "coverage_tier";
pub const COVERAGES_FIELD: &str = "coverages";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageTier {
    Essentiel,
    Confort,
    Premium,
}

impl CoverageTier {
    pub fn id(self) -> &'static str {
        match self {
            Self::Essentiel => "essentiel",
            Self::Confort => "confort",
            Self::Premium => "premium",
        }
    }

    /// Share of eligible expenses reimbursed, in percent.
    pub fn reimbursement_rate(self) -> u8 {
        match self {
            Self::Essentiel => 70,
            Self::Confort => 85,
            Self::Premium => 95,
        }
    }

    pub fn multiplier(self) -> Decimal {
        match self {
            Self::Essentiel => Decimal::ONE,
            Self::Confort => Decimal::new(14, 1),
            Self::Premium => Decimal::new(18, 1),
        }
    }

    pub fn deductible(self) -> Decimal {
        match self {
            Self::Essentiel => Decimal::from(300),
            Self::Confort => Decimal::from(200),
            Self::Premium => Decimal::from(100),
        }
    }
}

impl fmt::Display for CoverageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for CoverageTier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "essentiel" | "essential" => Ok(Self::Essentiel),
            "confort" | "comfort" => Ok(Self::Confort),
            "premium" => Ok(Self::Premium),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown coverage tier `{other}` (expected essentiel|confort|premium)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub age: u32,
    pub tier: CoverageTier,
    pub selected_coverage_count: usize,
}

impl SimulationInput {
    /// Reads the simulation inputs from the health wizard answers.
    ///
    /// Returns `None` until both the age and the tier are present; the coverage
    /// count defaults to zero.
    pub fn from_fields(fields: &FieldMap) -> Option<Self> {
        let age = fields.get(AGE_FIELD)?.as_number()?;
        if age.is_sign_negative() || !age.fract().is_zero() {
            return None;
        }
        let age = age.to_u32()?;
        let tier = fields.get(TIER_FIELD)?.as_text()?.parse::<CoverageTier>().ok()?;
        let selected_coverage_count = fields
            .get(COVERAGES_FIELD)
            .and_then(|value| value.as_selection())
            .map(|values| values.len())
            .unwrap_or(0);

        Some(Self { age, tier, selected_coverage_count })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumEstimate {
    pub monthly_premium: Decimal,
    pub reimbursement_rate: u8,
    pub annual_cap: Decimal,
    pub deductible: Decimal,
}

fn age_multiplier(age: u32) -> Decimal {
    if age > 50 {
        Decimal::new(15, 1)
    } else if age > 30 {
        Decimal::new(12, 1)
    } else {
        Decimal::ONE
    }
}

pub fn simulate_health_premium(input: &SimulationInput) -> PremiumEstimate {
    let base = Decimal::from(BASE_MONTHLY_PREMIUM) * age_multiplier(input.age);
    let add_ons = Decimal::from(PER_COVERAGE_INCREMENT) * Decimal::from(input.selected_coverage_count);
    let monthly_premium = ((base + add_ons) * input.tier.multiplier())
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize();

    PremiumEstimate {
        monthly_premium,
        reimbursement_rate: input.tier.reimbursement_rate(),
        annual_cap: monthly_premium * Decimal::from(ANNUAL_CAP_MONTHS),
        deductible: input.tier.deductible(),
    }
}

/// Simulation hook used by the health wizard.
pub fn estimate_from_fields(fields: &FieldMap) -> Option<PremiumEstimate> {
    SimulationInput::from_fields(fields).map(|input| simulate_health_premium(&input))
}
