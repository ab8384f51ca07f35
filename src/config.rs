use anyhow::{Context, Result, bail};
use dotenv::dotenv;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::media::VideoContainer;

/// Detector and server settings, read from the environment (and `.env`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    /// Interpreter binary launched for the detector (`PYTHON_PATH`).
    #[serde(default = "default_python_path")]
    pub python_path: String,
    /// Weights file handed to the detector.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// Directory holding the `threat_detector` module.
    #[serde(default = "default_detector_dir")]
    pub detector_dir: PathBuf,
    /// Use this driver instead of the generated one.
    #[serde(default)]
    pub detector_script: Option<PathBuf>,
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
    #[serde(default)]
    pub video_container: VideoContainer,
    /// Run detection on every Nth video frame.
    #[serde(default = "default_frame_stride")]
    pub frame_stride: u32,
    #[serde(default)]
    pub detector_timeout_secs: Option<u64>,
    #[serde(default = "default_upload_limit_mb")]
    pub upload_limit_mb: u64,
    #[serde(default)]
    pub frontend_dir: Option<PathBuf>,
}

fn default_python_path() -> String {
    "python3".to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from("best.pt")
}

fn default_confidence_threshold() -> f32 {
    0.3
}

fn default_detector_dir() -> PathBuf {
    PathBuf::from("./detection")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_frame_stride() -> u32 {
    1
}

fn default_upload_limit_mb() -> u64 {
    50
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            python_path: default_python_path(),
            model_path: default_model_path(),
            confidence_threshold: default_confidence_threshold(),
            detector_dir: default_detector_dir(),
            detector_script: None,
            workspace_dir: default_workspace_dir(),
            video_container: VideoContainer::default(),
            frame_stride: default_frame_stride(),
            detector_timeout_secs: None,
            upload_limit_mb: default_upload_limit_mb(),
            frontend_dir: None,
        }
    }
}

impl DetectorConfig {
    /// Loads `.env` if present, then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let config = envy::from_env::<DetectorConfig>()
            .context("Failed to read detector configuration from environment")?;
        config.validate()?;
        info!(
            "Detector config: interpreter={} model={:?} threshold={} container={}",
            config.python_path,
            config.model_path,
            config.confidence_threshold,
            config.video_container.extension()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            bail!(
                "CONFIDENCE_THRESHOLD must be in (0, 1], got {}",
                self.confidence_threshold
            );
        }
        if self.frame_stride == 0 {
            bail!("FRAME_STRIDE must be at least 1");
        }
        if self.upload_limit_mb == 0 {
            bail!("UPLOAD_LIMIT_MB must be at least 1");
        }
        if self.python_path.trim().is_empty() {
            bail!("PYTHON_PATH must not be empty");
        }
        Ok(())
    }
}
