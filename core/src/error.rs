use std::path::PathBuf;

use thiserror::Error;

/// imgstack error types
#[derive(Error, Debug)]
pub enum StackError {
    /// Build file missing at invocation time
    #[error("Build file not found: {}", path.display())]
    MissingBuildFile { path: PathBuf },

    /// Two builds in the same run would produce the same reference
    #[error("Derived tag '{tag}' is produced by both stage '{first}' and stage '{second}'")]
    TagCollision {
        tag: String,
        first: String,
        second: String,
    },

    /// A stage references a stage that does not run before it
    #[error("Stage '{stage}' references unknown upstream stage '{upstream}'")]
    UnknownStage { stage: String, upstream: String },

    /// The upstream stage never produces a build for the requested platform
    #[error("Stage '{upstream}' does not build platform '{platform}' (needed by '{stage}')")]
    PlatformNotBuilt {
        stage: String,
        upstream: String,
        platform: String,
    },

    /// Malformed `KEY=VALUE` build argument
    #[error("Invalid build arg (expected KEY=VALUE): {0}")]
    InvalidBuildArg(String),

    /// Unsupported build engine name
    #[error("Unknown builder '{0}' (supported: docker, podman)")]
    UnknownEngine(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for StackError {
    fn from(err: serde_yaml::Error) -> Self {
        StackError::SerializationError(err.to_string())
    }
}

/// Result type alias for imgstack operations
pub type Result<T> = std::result::Result<T, StackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_build_file_display() {
        let error = StackError::MissingBuildFile {
            path: PathBuf::from("/work/base-image/Dockerfile"),
        };
        assert_eq!(
            error.to_string(),
            "Build file not found: /work/base-image/Dockerfile"
        );
    }

    #[test]
    fn test_tag_collision_display() {
        let error = StackError::TagCollision {
            tag: "app:latest".to_string(),
            first: "base".to_string(),
            second: "dev".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Derived tag 'app:latest' is produced by both stage 'base' and stage 'dev'"
        );
    }

    #[test]
    fn test_unknown_stage_display() {
        let error = StackError::UnknownStage {
            stage: "dev".to_string(),
            upstream: "base".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Stage 'dev' references unknown upstream stage 'base'"
        );
    }

    #[test]
    fn test_invalid_build_arg_display() {
        let error = StackError::InvalidBuildArg("NOEQUALS".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid build arg (expected KEY=VALUE): NOEQUALS"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: StackError = io_error.into();
        assert!(matches!(error, StackError::IoError(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_yaml_error_conversion() {
        let result: std::result::Result<serde_yaml::Value, _> =
            serde_yaml::from_str("invalid: yaml: content:");
        let error: StackError = result.unwrap_err().into();
        assert!(matches!(error, StackError::SerializationError(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let error: StackError = result.unwrap_err().into();
        assert!(matches!(error, StackError::SerializationError(_)));
    }
}
