use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::wizard::validation::{
    AttachmentLimits, DEFAULT_MAX_ATTACHMENTS_PER_FIELD, DEFAULT_MAX_ATTACHMENT_BYTES,
};

pub const DEFAULT_CONFIG_FILE: &str = "courtier.toml";
pub const NESTED_CONFIG_FILE: &str = "config/courtier.toml";

const MAX_ATTACHMENTS_CEILING: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub wizard: WizardConfig,
    pub catalog: CatalogConfig,
    pub submission: SubmissionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WizardConfig {
    pub max_attachment_bytes: u64,
    pub max_attachments_per_field: usize,
    /// Pins the year used by year-range checks; the current UTC year when unset.
    pub reference_year: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogConfig {
    /// TOML overlay on top of the built-in catalog.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmissionConfig {
    pub outbox_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub catalog_path: Option<PathBuf>,
    pub outbox_dir: Option<PathBuf>,
    pub reference_year: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            wizard: WizardConfig {
                max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
                max_attachments_per_field: DEFAULT_MAX_ATTACHMENTS_PER_FIELD,
                reference_year: None,
            },
            catalog: CatalogConfig::default(),
            submission: SubmissionConfig { outbox_dir: PathBuf::from("outbox") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn attachment_limits(&self) -> AttachmentLimits {
        AttachmentLimits {
            max_bytes: self.wizard.max_attachment_bytes,
            max_files: self.wizard.max_attachments_per_field,
        }
    }

    /// Built-in catalog, overlaid with `[catalog] path` when configured.
    pub fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        match &self.catalog.path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::standard()),
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(wizard) = patch.wizard {
            if let Some(max_attachment_bytes) = wizard.max_attachment_bytes {
                self.wizard.max_attachment_bytes = max_attachment_bytes;
            }
            if let Some(max_attachments_per_field) = wizard.max_attachments_per_field {
                self.wizard.max_attachments_per_field = max_attachments_per_field;
            }
            if let Some(reference_year) = wizard.reference_year {
                self.wizard.reference_year = Some(reference_year);
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(submission) = patch.submission {
            if let Some(outbox_dir) = submission.outbox_dir {
                self.submission.outbox_dir = outbox_dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COURTIER_WIZARD_MAX_ATTACHMENT_BYTES") {
            self.wizard.max_attachment_bytes =
                parse_env("COURTIER_WIZARD_MAX_ATTACHMENT_BYTES", &value)?;
        }
        if let Some(value) = read_env("COURTIER_WIZARD_MAX_ATTACHMENTS_PER_FIELD") {
            self.wizard.max_attachments_per_field =
                parse_env("COURTIER_WIZARD_MAX_ATTACHMENTS_PER_FIELD", &value)?;
        }
        if let Some(value) = read_env("COURTIER_WIZARD_REFERENCE_YEAR") {
            self.wizard.reference_year = Some(parse_env("COURTIER_WIZARD_REFERENCE_YEAR", &value)?);
        }

        if let Some(value) = read_env("COURTIER_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("COURTIER_SUBMISSION_OUTBOX_DIR") {
            self.submission.outbox_dir = PathBuf::from(value);
        }

        let log_level =
            read_env("COURTIER_LOGGING_LEVEL").or_else(|| read_env("COURTIER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COURTIER_LOGGING_FORMAT").or_else(|| read_env("COURTIER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(outbox_dir) = overrides.outbox_dir {
            self.submission.outbox_dir = outbox_dir;
        }
        if let Some(reference_year) = overrides.reference_year {
            self.wizard.reference_year = Some(reference_year);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_wizard(&self.wizard)?;
        validate_catalog(&self.catalog)?;
        validate_submission(&self.submission)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_wizard(wizard: &WizardConfig) -> Result<(), ConfigError> {
    if wizard.max_attachment_bytes == 0 {
        return Err(ConfigError::Validation(
            "wizard.max_attachment_bytes must be greater than zero".to_string(),
        ));
    }

    if wizard.max_attachments_per_field == 0
        || wizard.max_attachments_per_field > MAX_ATTACHMENTS_CEILING
    {
        return Err(ConfigError::Validation(format!(
            "wizard.max_attachments_per_field must be in range 1..={MAX_ATTACHMENTS_CEILING}"
        )));
    }

    if let Some(year) = wizard.reference_year {
        if !(1900..=2200).contains(&year) {
            return Err(ConfigError::Validation(
                "wizard.reference_year must be in range 1900..=2200".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    if let Some(path) = &catalog.path {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "catalog.path must not be empty; remove the key to use the built-in catalog"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_submission(submission: &SubmissionConfig) -> Result<(), ConfigError> {
    if submission.outbox_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "submission.outbox_dir is required (directory receiving submitted payloads)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    wizard: Option<WizardPatch>,
    catalog: Option<CatalogPatch>,
    submission: Option<SubmissionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WizardPatch {
    max_attachment_bytes: Option<u64>,
    max_attachments_per_field: Option<usize>,
    reference_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionPatch {
    outbox_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
