use log::error;
use rocket::http::Status;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of one detection run, each mapped to the status the client sees.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to prepare workspace directory {path:?}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} detection failed")]
    Detection {
        kind: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Detection {kind} output not found")]
    ArtifactMissing { kind: &'static str, path: PathBuf },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            PipelineError::Validation(_) => Status::BadRequest,
            _ => Status::InternalServerError,
        }
    }

    /// Extra diagnostics exposed to the client as `details`.
    pub fn details(&self) -> Option<String> {
        match self {
            PipelineError::Detection { stderr, .. } => Some(stderr.clone()),
            PipelineError::Workspace { source, .. } | PipelineError::Io { source, .. } => {
                Some(source.to_string())
            }
            PipelineError::ArtifactMissing { path, .. } => Some(path.display().to_string()),
            PipelineError::Validation(_) => None,
        }
    }
}

/// Logs the full chain of an error and hands it back.
pub fn handle_error(error: anyhow::Error) -> anyhow::Error {
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        message.push_str(&format!("\n  caused by: {cause}"));
    }
    error!("{}", message);
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_client_error() {
        let err = PipelineError::validation("No file provided");
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(err.to_string(), "No file provided");
        assert!(err.details().is_none());
    }

    #[test]
    fn detection_carries_stderr() {
        let err = PipelineError::Detection {
            kind: "Video",
            exit_code: Some(2),
            stderr: "Traceback".to_string(),
        };
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.to_string(), "Video detection failed");
        assert_eq!(err.details().as_deref(), Some("Traceback"));
    }
}
