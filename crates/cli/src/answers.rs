//! Answers files: one flat TOML table of field key -> value.
//!
//! ```toml
//! age = 35
//! coverages = ["dental", "optical"]
//! coverage_tier = "confort"
//! terms_accepted = true
//! documents = [{ name = "cin.pdf", size_bytes = 120000 }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use courtier_core::domain::field::{Attachment, FieldKind, FieldValue};
use courtier_core::StepSpecification;
use rust_decimal::Decimal;
use serde::Deserialize;
use toml::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Value(FieldValue),
    /// Files are added one by one so the attachment limits apply.
    Files(Vec<Attachment>),
}

#[derive(Debug, Default)]
pub struct Answers {
    values: BTreeMap<String, Answer>,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    name: String,
    size_bytes: u64,
}

impl Answers {
    pub fn load(path: &Path, spec: &StepSpecification) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read answers file `{}`", path.display()))?;
        Self::parse(&raw, spec).with_context(|| format!("invalid answers file `{}`", path.display()))
    }

    pub fn parse(raw: &str, spec: &StepSpecification) -> Result<Self> {
        let table: BTreeMap<String, Value> = toml::from_str(raw)?;
        let mut values = BTreeMap::new();

        for (key, value) in table {
            let Some(field) = spec.field(&key) else {
                bail!("`{key}` is not a field of the {} wizard", spec.product());
            };
            let answer = convert(&key, field.kind, value)?;
            values.insert(key, answer);
        }

        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&Answer> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn convert(key: &str, kind: FieldKind, value: Value) -> Result<Answer> {
    let mismatch = |expected: &str| anyhow!("`{key}` expects {expected}");

    let converted = match kind {
        FieldKind::Text | FieldKind::Choice => match value {
            Value::String(text) => FieldValue::Text(text),
            _ => return Err(mismatch("a string")),
        },
        FieldKind::Number => match value {
            Value::Integer(number) => FieldValue::Number(Decimal::from(number)),
            Value::Float(number) => FieldValue::Number(
                Decimal::try_from(number).map_err(|_| mismatch("a finite number"))?,
            ),
            Value::String(text) if text.trim().is_empty() => FieldValue::Empty,
            Value::String(text) => FieldValue::Number(
                Decimal::from_str(text.trim()).map_err(|_| mismatch("a number"))?,
            ),
            _ => return Err(mismatch("a number")),
        },
        FieldKind::Flag => match value {
            Value::Boolean(flag) => FieldValue::Flag(flag),
            _ => return Err(mismatch("true or false")),
        },
        FieldKind::MultiChoice => match value {
            Value::Array(items) => {
                let ids = items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(id) => Ok(id),
                        _ => Err(mismatch("an array of option ids")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                FieldValue::selection(ids)
            }
            _ => return Err(mismatch("an array of option ids")),
        },
        FieldKind::Attachments => {
            let files: Vec<RawAttachment> = value
                .try_into()
                .map_err(|_| mismatch("an array of { name, size_bytes } tables"))?;
            return Ok(Answer::Files(
                files.into_iter().map(|file| Attachment::new(file.name, file.size_bytes)).collect(),
            ));
        }
    };

    Ok(Answer::Value(converted))
}
