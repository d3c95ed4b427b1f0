pub mod config;
pub mod products;
pub mod quote;
pub mod simulate;

use courtier_core::errors::ApplicationError;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            correlation_id: None,
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Maps a core failure through the interface layer. Only the user-safe
    /// message is printed; the detail goes to the log.
    pub fn interface_failure(
        command: &str,
        error: ApplicationError,
        correlation_id: &str,
        exit_code: u8,
    ) -> Self {
        let interface = error.into_interface(correlation_id);
        tracing::warn!(
            event_name = "cli.command.failed",
            command,
            correlation_id,
            error_class = interface.error_class(),
            detail = %interface,
            "command failed"
        );

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(interface.error_class().to_string()),
            message: interface.user_message().to_string(),
            correlation_id: Some(correlation_id.to_string()),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Wraps a command-specific report document.
    pub fn report<T: Serialize>(report: &T, exit_code: u8) -> Self {
        Self { exit_code, output: serialize_payload(report) }
    }
}

fn serialize_payload<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use courtier_core::errors::{ApplicationError, DomainError};
    use courtier_core::{ProductKind, WizardError};
    use serde_json::Value;

    use super::CommandResult;

    #[test]
    fn core_failures_print_only_the_user_safe_message() {
        let error = ApplicationError::from(DomainError::from(WizardError::UnknownField {
            product: ProductKind::Home,
            key: "shoe_size".to_string(),
        }));

        let result = CommandResult::interface_failure("quote", error, "WZ-42", 4);
        assert_eq!(result.exit_code, 4);

        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(payload["error_class"], "bad_request");
        assert_eq!(payload["correlation_id"], "WZ-42");
        assert_eq!(
            payload["message"],
            "The request could not be processed. Check your answers and try again."
        );
        assert!(!result.output.contains("shoe_size"));
    }

    #[test]
    fn plain_failures_carry_no_correlation_id() {
        let result = CommandResult::failure("simulate", "invalid_input", "unknown tier", 4);
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert!(payload.get("correlation_id").is_none());
        assert_eq!(payload["message"], "unknown tier");
    }
}
