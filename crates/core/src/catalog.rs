use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::CoverageTier;

/// Option lists the wizards render as select inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogList {
    Cities,
    VehicleBrands,
    InsuranceTypes,
    PropertyTypes,
    Occupancy,
    HomeCoverages,
    HealthCoverages,
    CoverageTiers,
    FamilyStatus,
    YesNo,
}

impl CatalogList {
    pub const ALL: [CatalogList; 10] = [
        Self::Cities,
        Self::VehicleBrands,
        Self::InsuranceTypes,
        Self::PropertyTypes,
        Self::Occupancy,
        Self::HomeCoverages,
        Self::HealthCoverages,
        Self::CoverageTiers,
        Self::FamilyStatus,
        Self::YesNo,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Cities => "cities",
            Self::VehicleBrands => "vehicle_brands",
            Self::InsuranceTypes => "insurance_types",
            Self::PropertyTypes => "property_types",
            Self::Occupancy => "occupancy",
            Self::HomeCoverages => "home_coverages",
            Self::HealthCoverages => "health_coverages",
            Self::CoverageTiers => "coverage_tiers",
            Self::FamilyStatus => "family_status",
            Self::YesNo => "yes_no",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|list| list.key() == key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOption {
    pub id: String,
    pub label: String,
}

impl CatalogOption {
    fn new(id: &str, label: &str) -> Self {
        Self { id: id.to_string(), label: label.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown catalog list `{0}`")]
    UnknownList(String),
    #[error("catalog list `{list}` must not be empty")]
    EmptyList { list: String },
    #[error("catalog list `{list}` declares option `{id}` more than once")]
    DuplicateOption { list: String, id: String },
    #[error("coverage tier `{id}` has no premium rule (expected essentiel|confort|premium)")]
    UnpricedCoverageTier { id: String },
}

/// Read-only content store. Built once and shared with every wizard.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    lists: BTreeMap<CatalogList, Vec<CatalogOption>>,
}

impl Catalog {
    pub fn new(lists: BTreeMap<CatalogList, Vec<CatalogOption>>) -> Self {
        Self { lists }
    }

    pub fn standard() -> Self {
        let mut lists = BTreeMap::new();
        lists.insert(
            CatalogList::Cities,
            options(&[
                ("casablanca", "Casablanca"),
                ("rabat", "Rabat"),
                ("marrakech", "Marrakech"),
                ("tanger", "Tanger"),
                ("fes", "Fès"),
                ("agadir", "Agadir"),
                ("meknes", "Meknès"),
                ("oujda", "Oujda"),
            ]),
        );
        lists.insert(
            CatalogList::VehicleBrands,
            options(&[
                ("dacia", "Dacia"),
                ("renault", "Renault"),
                ("peugeot", "Peugeot"),
                ("volkswagen", "Volkswagen"),
                ("toyota", "Toyota"),
                ("hyundai", "Hyundai"),
                ("mercedes", "Mercedes-Benz"),
                ("other", "Autre marque"),
            ]),
        );
        lists.insert(
            CatalogList::InsuranceTypes,
            options(&[
                ("third_party", "Responsabilité civile"),
                ("third_party_extended", "Tiers étendu"),
                ("all_risks", "Tous risques"),
                ("other", "Autre"),
            ]),
        );
        lists.insert(
            CatalogList::PropertyTypes,
            options(&[("apartment", "Appartement"), ("house", "Maison"), ("villa", "Villa")]),
        );
        lists.insert(
            CatalogList::Occupancy,
            options(&[("owner", "Propriétaire occupant"), ("tenant", "Locataire")]),
        );
        lists.insert(
            CatalogList::HomeCoverages,
            options(&[
                ("fire", "Incendie"),
                ("water_damage", "Dégâts des eaux"),
                ("civil_liability", "Responsabilité civile"),
                ("theft", "Vol"),
                ("glass_breakage", "Bris de glace"),
                ("natural_disasters", "Catastrophes naturelles"),
                ("legal_protection", "Protection juridique"),
            ]),
        );
        lists.insert(
            CatalogList::HealthCoverages,
            options(&[
                ("hospitalization", "Hospitalisation"),
                ("outpatient", "Soins courants"),
                ("pharmacy", "Pharmacie"),
                ("dental", "Dentaire"),
                ("optical", "Optique"),
                ("maternity", "Maternité"),
            ]),
        );
        lists.insert(
            CatalogList::CoverageTiers,
            options(&[("essentiel", "Essentiel"), ("confort", "Confort"), ("premium", "Premium")]),
        );
        lists.insert(
            CatalogList::FamilyStatus,
            options(&[("single", "Célibataire"), ("couple", "Couple"), ("family", "Famille")]),
        );
        lists.insert(CatalogList::YesNo, options(&[("yes", "Oui"), ("no", "Non")]));
        Self { lists }
    }

    /// Overlays the lists found in `raw` on top of the standard catalog.
    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let parsed: BTreeMap<String, Vec<CatalogOption>> = toml::from_str(raw)?;
        let mut catalog = Self::standard();

        for (key, entries) in parsed {
            let list = CatalogList::from_key(&key).ok_or(CatalogError::UnknownList(key))?;
            if entries.is_empty() {
                return Err(CatalogError::EmptyList { list: list.key().to_string() });
            }

            let mut seen = BTreeSet::new();
            for entry in &entries {
                if !seen.insert(entry.id.as_str()) {
                    return Err(CatalogError::DuplicateOption {
                        list: list.key().to_string(),
                        id: entry.id.clone(),
                    });
                }
            }

            if list == CatalogList::CoverageTiers {
                if let Some(entry) = entries.iter().find(|entry| entry.id.parse::<CoverageTier>().is_err()) {
                    return Err(CatalogError::UnpricedCoverageTier { id: entry.id.clone() });
                }
            }

            catalog.lists.insert(list, entries);
        }

        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn options(&self, list: CatalogList) -> &[CatalogOption] {
        self.lists.get(&list).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, list: CatalogList, id: &str) -> bool {
        self.options(list).iter().any(|option| option.id == id)
    }

    pub fn label(&self, list: CatalogList, id: &str) -> Option<&str> {
        self.options(list).iter().find(|option| option.id == id).map(|option| option.label.as_str())
    }
}

fn options(entries: &[(&str, &str)]) -> Vec<CatalogOption> {
    entries.iter().map(|(id, label)| CatalogOption::new(id, label)).collect()
}
