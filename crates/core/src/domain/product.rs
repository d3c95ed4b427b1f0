use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WizardId(pub String);

impl WizardId {
    pub fn generate() -> Self {
        Self(format!("WZ-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for WizardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insurance products that offer a quote-request wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductKind {
    /// Motor "new business" request.
    NewBusiness,
    /// Motor request with the additional driver-history step.
    NewBusinessWithHistory,
    /// Multirisk home (MRH).
    Home,
    /// Sehassur health cover, the only product with a premium simulation.
    Health,
}

impl ProductKind {
    pub const ALL: [ProductKind; 4] =
        [Self::NewBusiness, Self::NewBusinessWithHistory, Self::Home, Self::Health];

    pub fn slug(self) -> &'static str {
        match self {
            Self::NewBusiness => "new-business",
            Self::NewBusinessWithHistory => "new-business-history",
            Self::Home => "home",
            Self::Health => "health",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::NewBusiness => "Auto - new business",
            Self::NewBusinessWithHistory => "Auto - new business with driver history",
            Self::Home => "Multirisk home",
            Self::Health => "Sehassur health",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProductKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new-business" | "auto" => Ok(Self::NewBusiness),
            "new-business-history" | "auto-history" => Ok(Self::NewBusinessWithHistory),
            "home" | "mrh" => Ok(Self::Home),
            "health" | "sehassur" => Ok(Self::Health),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown product `{other}` (expected new-business|new-business-history|home|health)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProductKind, WizardId};

    #[test]
    fn slugs_parse_back_to_the_same_product() {
        for product in ProductKind::ALL {
            assert_eq!(product.slug().parse::<ProductKind>().expect("slug parses"), product);
        }
        assert_eq!("MRH".parse::<ProductKind>().expect("alias"), ProductKind::Home);
        assert!("travel".parse::<ProductKind>().is_err());
    }

    #[test]
    fn generated_wizard_ids_are_unique() {
        assert_ne!(WizardId::generate(), WizardId::generate());
    }
}
