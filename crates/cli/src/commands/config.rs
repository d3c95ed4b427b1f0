use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use courtier_core::config::{resolve_config_path, AppConfig, LoadOptions};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigReport {
    command: &'static str,
    status: &'static str,
    precedence: &'static str,
    config_file: Option<String>,
    entries: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = vec![
        entry(
            "wizard.max_attachment_bytes",
            config.wizard.max_attachment_bytes.to_string(),
            source("wizard.max_attachment_bytes", &["COURTIER_WIZARD_MAX_ATTACHMENT_BYTES"]),
        ),
        entry(
            "wizard.max_attachments_per_field",
            config.wizard.max_attachments_per_field.to_string(),
            source("wizard.max_attachments_per_field", &["COURTIER_WIZARD_MAX_ATTACHMENTS_PER_FIELD"]),
        ),
        entry(
            "wizard.reference_year",
            config.wizard.reference_year.map(|year| year.to_string()).unwrap_or_else(|| "<current>".to_string()),
            source("wizard.reference_year", &["COURTIER_WIZARD_REFERENCE_YEAR"]),
        ),
        entry(
            "catalog.path",
            display_path(config.catalog.path.as_deref()),
            source("catalog.path", &["COURTIER_CATALOG_PATH"]),
        ),
        entry(
            "submission.outbox_dir",
            config.submission.outbox_dir.display().to_string(),
            source("submission.outbox_dir", &["COURTIER_SUBMISSION_OUTBOX_DIR"]),
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["COURTIER_LOGGING_LEVEL", "COURTIER_LOG_LEVEL"]),
        ),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source("logging.format", &["COURTIER_LOGGING_FORMAT", "COURTIER_LOG_FORMAT"]),
        ),
    ];

    CommandResult::report(
        &ConfigReport {
            command: "config",
            status: "ok",
            precedence: "override > env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            entries,
        },
        0,
    )
}

fn entry(key: &'static str, value: String, source: String) -> ConfigEntry {
    ConfigEntry { key, value, source }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "<built-in>".to_string())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
