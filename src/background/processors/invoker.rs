//! Detector invocation - builds and runs the external detector command
//!
//! Includes:
//! - One invocation builder keyed by media kind
//! - Driver script staging
//! - Child process execution with captured stdout/stderr

use log::{error, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::background::processors::script::render_script;
use crate::background::processors::workspace::RequestWorkspace;
use crate::common::errors::PipelineError;
use crate::config::DetectorConfig;
use crate::models::media::{MediaKind, UploadedMedia, VideoContainer};

/// Kind-specific part of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    Image,
    Video {
        container: VideoContainer,
        frame_stride: u32,
    },
}

impl InvocationKind {
    pub fn for_media(kind: MediaKind, config: &DetectorConfig) -> Self {
        match kind {
            MediaKind::Image => InvocationKind::Image,
            MediaKind::Video => InvocationKind::Video {
                container: config.video_container,
                frame_stride: config.frame_stride,
            },
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        match self {
            InvocationKind::Image => MediaKind::Image,
            InvocationKind::Video { .. } => MediaKind::Video,
        }
    }

    /// Images keep their own extension; videos are re-muxed into the
    /// configured container.
    pub fn output_extension(&self, input_extension: &str) -> String {
        match self {
            InvocationKind::Image => input_extension.to_string(),
            InvocationKind::Video { container, .. } => container.extension().to_string(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            InvocationKind::Image => "YOLO",
            InvocationKind::Video { .. } => "Video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Rendered into the request workspace; removed during cleanup.
    Generated(PathBuf),
    /// Operator-supplied driver; never touched.
    External(PathBuf),
}

impl ScriptSource {
    pub fn path(&self) -> &Path {
        match self {
            ScriptSource::Generated(path) | ScriptSource::External(path) => path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionInvocation {
    pub interpreter: String,
    pub script: ScriptSource,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub model_path: PathBuf,
    pub confidence_threshold: f32,
    pub detector_dir: PathBuf,
    pub frames_dir: PathBuf,
    pub kind: InvocationKind,
}

impl DetectionInvocation {
    pub fn build(
        media: &UploadedMedia,
        request: &RequestWorkspace,
        config: &DetectorConfig,
    ) -> Self {
        let kind = InvocationKind::for_media(media.kind, config);
        let output_path = request.output_path(&media.stem, &kind.output_extension(&media.extension));
        let script = match &config.detector_script {
            Some(path) => ScriptSource::External(path.clone()),
            None => ScriptSource::Generated(request.script_path()),
        };

        Self {
            interpreter: config.python_path.clone(),
            script,
            input_path: media.input_path.clone(),
            output_path,
            model_path: config.model_path.clone(),
            confidence_threshold: config.confidence_threshold,
            detector_dir: config.detector_dir.clone(),
            frames_dir: request.frames_dir(),
            kind,
        }
    }

    pub fn generated_script(&self) -> Option<&Path> {
        match &self.script {
            ScriptSource::Generated(path) => Some(path),
            ScriptSource::External(_) => None,
        }
    }

    /// Command-line arguments following the interpreter.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.script.path().into(),
            "--input".into(),
            self.input_path.clone().into(),
            "--output".into(),
            self.output_path.clone().into(),
            "--model".into(),
            self.model_path.clone().into(),
            "--confidence".into(),
            self.confidence_threshold.to_string().into(),
            "--detector-dir".into(),
            self.detector_dir.clone().into(),
        ];
        if let InvocationKind::Video {
            container,
            frame_stride,
        } = self.kind
        {
            args.extend([
                "--fourcc".into(),
                container.fourcc().into(),
                "--frame-stride".into(),
                frame_stride.to_string().into(),
                "--frames-dir".into(),
                self.frames_dir.clone().into(),
            ]);
        }
        args
    }

    /// Writes the driver script when this invocation uses a generated one.
    pub async fn stage_script(&self) -> Result<(), PipelineError> {
        if let Some(path) = self.generated_script() {
            tokio::fs::write(path, render_script(&self.kind))
                .await
                .map_err(|source| {
                    PipelineError::io(format!("Failed to write driver script {path:?}"), source)
                })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOutput {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationOutput {
    /// Turns a failed exit into a [`PipelineError::Detection`], handing back
    /// stdout otherwise.
    pub fn into_stdout(self, kind: InvocationKind) -> Result<String, PipelineError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(PipelineError::Detection {
                kind: kind.label(),
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Runs the detector to completion and captures its output.
pub async fn invoke(
    invocation: &DetectionInvocation,
    timeout: Option<Duration>,
) -> Result<InvocationOutput, PipelineError> {
    let start_time = Instant::now();
    let mut command = Command::new(&invocation.interpreter);
    command
        .args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, command.output()).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Detector exceeded {:?} for {:?}; child killed",
                    limit, invocation.input_path
                );
                return Err(PipelineError::Detection {
                    kind: invocation.kind.label(),
                    exit_code: None,
                    stderr: format!("detector timed out after {} s", limit.as_secs()),
                });
            }
        },
        None => command.output().await,
    };

    let output = output.map_err(|err| {
        error!("Failed to launch `{}`: {}", invocation.interpreter, err);
        PipelineError::Detection {
            kind: invocation.kind.label(),
            exit_code: None,
            stderr: format!("failed to launch `{}`: {}", invocation.interpreter, err),
        }
    })?;

    let result = InvocationOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if result.success {
        info!(duration = &*format!("{:?}", start_time.elapsed());
            "Detector finished for {:?}",
            invocation.input_path
        );
    } else {
        warn!(duration = &*format!("{:?}", start_time.elapsed());
            "Detector exited with {} for {:?}: {}",
            result
                .exit_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            invocation.input_path,
            result.stderr.trim()
        );
    }

    Ok(result)
}
