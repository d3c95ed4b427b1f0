use std::path::{Path, PathBuf};

use async_trait::async_trait;
use courtier_core::errors::ApplicationError;
use courtier_core::submission::{SubmissionPayload, SubmissionReceipt, Submitter};
use tracing::info;

/// Writes each submitted payload as `<reference>.json` into a directory.
#[derive(Clone, Debug)]
pub struct OutboxSubmitter {
    dir: PathBuf,
}

impl OutboxSubmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, payload: &SubmissionPayload) -> PathBuf {
        self.dir.join(format!("{}.json", payload.reference))
    }
}

#[async_trait]
impl Submitter for OutboxSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, ApplicationError> {
        let body = serde_json::to_vec_pretty(payload)
            .map_err(|error| ApplicationError::Integration(format!("payload serialization failed: {error}")))?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|error| {
            ApplicationError::Persistence(format!("could not create outbox `{}`: {error}", self.dir.display()))
        })?;

        let path = self.path_for(payload);
        tokio::fs::write(&path, body).await.map_err(|error| {
            ApplicationError::Persistence(format!("could not write `{}`: {error}", path.display()))
        })?;

        info!(
            event_name = "submission.outbox.written",
            wizard_id = %payload.wizard_id,
            reference = %payload.reference,
            path = %path.display(),
            "payload written to outbox"
        );
        Ok(SubmissionReceipt::new(payload.reference).with_location(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use courtier_core::products::{self, home};
    use courtier_core::{Catalog, FieldValue, ProductKind, WizardEngine};
    use tempfile::TempDir;

    use super::OutboxSubmitter;
    use courtier_core::submission::Submitter;

    #[tokio::test]
    async fn payload_lands_in_the_outbox_as_json() {
        let dir = TempDir::new().expect("temp dir");
        let submitter = OutboxSubmitter::new(dir.path().join("nested/outbox"));
        let spec = products::specification(ProductKind::Home).expect("spec builds");
        let mut engine = WizardEngine::new(Arc::new(spec), Arc::new(Catalog::standard()));
        engine
            .set_field(home::SHOW_OPTIONAL_COVERAGES, FieldValue::Flag(true))
            .expect("known field");
        engine.set_field(home::PROPERTY_TYPE, FieldValue::text("villa")).expect("known field");

        let payload = courtier_core::SubmissionPayload::assemble(
            engine.id(),
            engine.spec(),
            engine.fields(),
            None,
        );
        let receipt = submitter.submit(&payload).await.expect("written");

        let path = submitter.path_for(&payload);
        assert_eq!(receipt.location.as_deref(), Some(path.display().to_string().as_str()));
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("file exists")).expect("valid json");
        assert_eq!(written["product"], "home");
        assert_eq!(written["fields"]["property_type"], "villa");
        assert!(written["fields"].get("show_optional_coverages").is_none());
    }
}
