//! Setup/initialization module - handles application startup tasks
//!
//! Includes:
//! - Logger initialization
//! - Detector interpreter availability check
//! - Model file check
//! - Workspace initialization

use anstyle::{AnsiColor, Style};
use env_logger::{Builder, WriteStyle};
use log::kv::Key;
use log::{error, info, warn};
use std::io::Write;
use std::process::Command;

use crate::background::processors::workspace::Workspace;
use crate::common::errors::PipelineError;
use crate::config::DetectorConfig;

// ────────────────────────────────────────────────────────────────
// Interpreter Check
// ────────────────────────────────────────────────────────────────

/// Version line reported by the detector interpreter, if it runs.
pub fn interpreter_version(interpreter: &str) -> Option<String> {
    let output = Command::new(interpreter).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    // Older Pythons print the version on stderr.
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        String::from_utf8_lossy(&output.stdout).into_owned()
    };
    text.lines().next().map(|line| line.trim().to_string())
}

/// Logs whether the interpreter and the model are usable. Never fatal: a
/// missing model only produces empty detections.
pub fn check_detector(config: &DetectorConfig) {
    match interpreter_version(&config.python_path) {
        Some(version) => info!("{} version: {}", config.python_path, version),
        None => error!(
            "`{}` is not installed or not available in PATH. Set PYTHON_PATH to a working interpreter.",
            config.python_path
        ),
    }

    if config.model_path.is_file() {
        info!("Model found at {:?}", config.model_path);
    } else {
        warn!(
            "Model not found at {:?}; every detection will come back empty",
            config.model_path
        );
    }

    if let Some(script) = &config.detector_script {
        if !script.is_file() {
            warn!("Configured DETECTOR_SCRIPT {:?} does not exist", script);
        }
    } else if !config.detector_dir.is_dir() {
        warn!(
            "Detector directory {:?} does not exist; the generated driver will fail to import threat_detector",
            config.detector_dir
        );
    }
}

// ────────────────────────────────────────────────────────────────
// Workspace Initialization
// ────────────────────────────────────────────────────────────────

pub fn initialize_workspace(config: &DetectorConfig) -> Result<Workspace, PipelineError> {
    let workspace = Workspace::ensure(&config.workspace_dir)?;
    info!("Workspace ready at {:?}", workspace.base);
    Ok(workspace)
}

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

pub fn initialize_logger() {
    let dim = Style::new().fg_color(Some(AnsiColor::BrightBlack.into()));
    let cyan = Style::new().fg_color(Some(AnsiColor::Cyan.into()));

    Builder::new()
        .write_style(WriteStyle::Auto)
        .format(move |buf, record| {
            let ts = buf.timestamp();
            let level_style = buf.default_level_style(record.level());

            // Extract raw duration and format to 2 decimal places
            let dur_raw = record
                .key_values()
                .get(Key::from("duration"))
                .map(|v| {
                    let s = format!("{}", v);
                    if let Some(idx) = s.find(|c: char| c.is_alphabetic()) {
                        let (num, unit) = (&s[..idx], &s[idx..]);
                        if let Ok(val) = num.parse::<f32>() {
                            return format!("{:.2} {}", val, unit);
                        }
                    }
                    s
                })
                .unwrap_or_default();

            let dur = if dur_raw.is_empty() {
                " ".repeat(10)
            } else {
                format!("{cyan}{:>10}{cyan:#}", dur_raw)
            };

            writeln!(
                buf,
                "{dim}{ts}{dim:#} {level_style}{}{level_style:#} {dim}{}{dim:#}",
                record.level(),
                record.target()
            )?;

            let message = format!("{}", record.args());
            let subsequent_indent = " ".repeat(11);
            let mut lines = message.lines();

            if let Some(first_line) = lines.next() {
                writeln!(buf, "{} {}", dur, first_line)?;
            }
            for line in lines {
                writeln!(buf, "{}{}", subsequent_indent, line)?;
            }

            Ok(())
        })
        // Only show INFO+ globally, WARN+ for Rocket
        .filter(None, log::LevelFilter::Info)
        .filter(Some("rocket"), log::LevelFilter::Warn)
        .parse_default_env()
        .init();
}
