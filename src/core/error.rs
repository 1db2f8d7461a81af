use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CapabilityDuplicate,
    CapabilityUnknown,

    PipelineEmpty,
    PipelineNotFound,
    PipelineAborted,

    StepExecutionFailed,
    CommandFailed,

    ReporterFailed,

    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CapabilityDuplicate => "capability.duplicate",
            ErrorCode::CapabilityUnknown => "capability.unknown",

            ErrorCode::PipelineEmpty => "pipeline.empty",
            ErrorCode::PipelineNotFound => "pipeline.not_found",
            ErrorCode::PipelineAborted => "pipeline.aborted",

            ErrorCode::StepExecutionFailed => "step.execution_failed",
            ErrorCode::CommandFailed => "command.failed",

            ErrorCode::ReporterFailed => "reporter.failed",

            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownCapabilityDetails {
    pub capability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    pub registered: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFailureDetails {
    pub pipeline: String,
    pub step: String,
    pub step_index: usize,
    pub phase: String,
    pub cause: CauseDetails,
}

/// Serializable view of a wrapped error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseDetails {
    pub code: String,
    pub message: String,
    pub details: Value,
}

impl From<&Error> for CauseDetails {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn capability_duplicate(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::CapabilityDuplicate,
            format!("Capability '{}' is already registered", name),
            to_details(NotFoundDetails { id: name }),
        )
    }

    pub fn capability_unknown(name: impl Into<String>, registered: Vec<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::CapabilityUnknown,
            format!("Unknown capability '{}'", name),
            to_details(UnknownCapabilityDetails {
                capability: name,
                pipeline: None,
                step_index: None,
                registered,
            }),
        )
        .with_hint("Run 'skillflow list' to see registered capabilities")
    }

    /// Unknown capability referenced by a pipeline step.
    pub fn step_capability_unknown(
        pipeline: impl Into<String>,
        step_index: usize,
        name: impl Into<String>,
        registered: Vec<String>,
    ) -> Self {
        let name = name.into();
        let pipeline = pipeline.into();
        Self::new(
            ErrorCode::CapabilityUnknown,
            format!(
                "Step {} of pipeline '{}' references unknown capability '{}'",
                step_index, pipeline, name
            ),
            to_details(UnknownCapabilityDetails {
                capability: name,
                pipeline: Some(pipeline),
                step_index: Some(step_index),
                registered,
            }),
        )
        .with_hint("Register the capability or fix the step's capability name")
    }

    pub fn pipeline_empty(pipeline: impl Into<String>) -> Self {
        let pipeline = pipeline.into();
        Self::new(
            ErrorCode::PipelineEmpty,
            format!("Pipeline '{}' has no steps", pipeline),
            to_details(NotFoundDetails { id: pipeline }),
        )
    }

    pub fn pipeline_not_found(name: impl Into<String>, available: Vec<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::PipelineNotFound,
            format!("Pipeline '{}' not found", name),
            serde_json::json!({ "id": name, "available": available }),
        )
        .with_hint("Run 'skillflow list' to see available pipelines")
    }

    pub fn pipeline_aborted(pipeline: impl Into<String>, step_index: usize) -> Self {
        let pipeline = pipeline.into();
        Self::new(
            ErrorCode::PipelineAborted,
            format!(
                "Pipeline '{}' was cancelled before step {}",
                pipeline, step_index
            ),
            serde_json::json!({ "pipeline": pipeline, "stepIndex": step_index }),
        )
        .with_hint("Re-run the pipeline; completed steps will be skipped by their probes")
    }

    /// Wraps a capability (or probe) error as a fatal step failure.
    pub fn step_execution_failed(
        pipeline: impl Into<String>,
        step: impl Into<String>,
        step_index: usize,
        phase: &str,
        cause: &Error,
    ) -> Self {
        let step = step.into();
        let mut err = Self::new(
            ErrorCode::StepExecutionFailed,
            format!("Step {} '{}' failed: {}", step_index, step, cause.message),
            to_details(StepFailureDetails {
                pipeline: pipeline.into(),
                step,
                step_index,
                phase: phase.to_string(),
                cause: CauseDetails::from(cause),
            }),
        );
        err.hints = cause.hints.clone();
        err.retryable = cause.retryable;
        err
    }

    pub fn command_failed(details: CommandFailedDetails) -> Self {
        let message = format!(
            "Command exited with code {}: {}",
            details.exit_code, details.command
        );
        Self::new(ErrorCode::CommandFailed, message, to_details(details))
    }

    pub fn reporter_failed(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ReporterFailed,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    /// Free-form failure for capabilities and probes; the message is kept as is.
    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            message.clone(),
            serde_json::json!({ "error": message }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_wraps_cause() {
        let cause = Error::other("disk full").with_hint("free some space");
        let err = Error::step_execution_failed("build", "prisma", 2, "execute", &cause);

        assert_eq!(err.code, ErrorCode::StepExecutionFailed);
        assert_eq!(err.details["stepIndex"], 2);
        assert_eq!(err.details["step"], "prisma");
        assert_eq!(err.details["cause"]["code"], "internal.unexpected");
        assert_eq!(err.hints, cause.hints);
        assert!(err.message.contains("disk full"));
    }

    #[test]
    fn unknown_step_capability_names_the_step() {
        let err = Error::step_capability_unknown("ship", 1, "deploy", vec!["build".to_string()]);

        assert_eq!(err.code.as_str(), "capability.unknown");
        assert_eq!(err.details["pipeline"], "ship");
        assert_eq!(err.details["stepIndex"], 1);
        assert_eq!(err.details["registered"][0], "build");
    }
}
