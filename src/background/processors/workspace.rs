//! Scratch directories for detection runs.
//!
//! Layout under the configured base directory:
//! - `input/<request id>/` holds the upload and the generated driver script
//! - `output/<request id>/` receives the annotated artifact

use std::path::PathBuf;
use uuid::Uuid;

use crate::common::errors::PipelineError;
use crate::common::{DETECTED_PREFIX, DRIVER_SCRIPT_NAME};

#[derive(Debug, Clone)]
pub struct Workspace {
    pub base: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Workspace {
    /// Idempotently creates the base directory with its `input` and `output`
    /// subdirectories.
    pub fn ensure(base: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let base = base.into();
        let workspace = Self {
            input_dir: base.join("input"),
            output_dir: base.join("output"),
            base,
        };
        for dir in [&workspace.input_dir, &workspace.output_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PipelineError::Workspace {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(workspace)
    }

    /// Creates the private directories of one request.
    pub async fn request(&self, id: Uuid) -> Result<RequestWorkspace, PipelineError> {
        let request = RequestWorkspace {
            id,
            input_dir: self.input_dir.join(id.to_string()),
            output_dir: self.output_dir.join(id.to_string()),
        };
        for dir in [&request.input_dir, &request.output_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| PipelineError::Workspace {
                    path: dir.clone(),
                    source,
                })?;
        }
        Ok(request)
    }
}

#[derive(Debug, Clone)]
pub struct RequestWorkspace {
    pub id: Uuid,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl RequestWorkspace {
    pub fn input_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.input_dir.join(format!("{stem}.{extension}"))
    }

    pub fn output_path(&self, stem: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{DETECTED_PREFIX}{stem}.{extension}"))
    }

    pub fn script_path(&self) -> PathBuf {
        self.input_dir.join(DRIVER_SCRIPT_NAME)
    }

    /// Scratch space for per-frame images written by the video driver.
    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join("frames")
    }
}
