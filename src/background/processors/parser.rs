use log::{info, warn};
use thiserror::Error;

use crate::background::processors::invoker::InvocationKind;
use crate::models::detection::DetectionSummary;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("detector produced no output")]
    Empty,
    #[error("detector output is not a detection summary: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Strict decode of detector stdout.
///
/// The whole output is tried first; when the detector interleaved log lines
/// with its result, only the last non-empty line is decoded.
pub fn try_parse(stdout: &str) -> Result<DetectionSummary, ParseError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    match serde_json::from_str::<DetectionSummary>(trimmed) {
        Ok(summary) => Ok(summary),
        Err(whole_err) => {
            let last_line = trimmed
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .ok_or(ParseError::Empty)?;
            if last_line.len() == trimmed.len() {
                return Err(whole_err.into());
            }
            Ok(serde_json::from_str::<DetectionSummary>(last_line)?)
        }
    }
}

/// Parse-or-empty: malformed output degrades to a summary with no
/// detections instead of failing the request.
pub fn parse(stdout: &str) -> DetectionSummary {
    match try_parse(stdout) {
        Ok(summary) => summary,
        Err(err) => {
            warn!("Failed to parse detection results ({err}); stdout was: {stdout:?}");
            DetectionSummary::empty()
        }
    }
}

/// Parses and re-establishes the summary invariants for the given kind.
pub fn summarize(stdout: &str, kind: InvocationKind) -> DetectionSummary {
    let summary = match kind {
        InvocationKind::Image => parse(stdout).normalize_image(),
        InvocationKind::Video { .. } => parse(stdout).normalize_video(),
    };
    info!(
        "Parsed detection results: {} objects found, threat level: {}",
        summary.total_objects, summary.overall_threat_level
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::detection::ThreatLevel;
    use crate::models::media::VideoContainer;

    const EMPTY_JSON: &str = r#"{"detections":[],"total_objects":0,"overall_threat_level":"NONE","overall_threat_score":0.0,"threat_count":0}"#;

    #[test]
    fn decodes_single_object() {
        let stdout = r#"{"detections":[{"class":"mines","confidence":0.81,"threat_level":"CRITICAL","bbox":[1,2,3,4]}],"total_objects":1,"overall_threat_level":"CRITICAL","overall_threat_score":0.85,"threat_count":1}"#;
        let summary = try_parse(stdout).unwrap();
        assert_eq!(summary.detections.len(), 1);
        assert_eq!(summary.overall_threat_level, ThreatLevel::Critical);
    }

    #[test]
    fn empty_and_truncated_output_yield_empty_summary() {
        for stdout in ["", "   \n", r#"{"detections":[{"class":"#, "Traceback (most recent call last):"] {
            let summary = parse(stdout);
            assert_eq!(summary, DetectionSummary::empty(), "stdout: {stdout:?}");
        }
    }

    #[test]
    fn log_lines_before_json_are_ignored() {
        let stdout = format!(
            "=== Video Threat Detection Script Started ===\nProcessed 42 frames\n{}\n\n",
            r#"{"detections":[{"class":"Submarine","confidence":0.9,"threat_level":"HIGH","bbox":[0,0,5,5]}],"total_objects":1,"frame_count":42,"frame_scores":[0.7],"overall_threat_level":"NONE","overall_threat_score":0.0,"threat_count":1}"#
        );
        let summary = try_parse(&stdout).unwrap();
        assert_eq!(summary.frame_count, Some(42));
        assert_eq!(summary.detections[0].class_label, "Submarine");
    }

    #[test]
    fn partial_objects_use_defaults() {
        let summary = try_parse(r#"{"detections":[]}"#).unwrap();
        assert_eq!(summary.overall_threat_level, ThreatLevel::None);
        assert_eq!(summary.threat_count, 0);
    }

    #[test]
    fn summarize_normalizes_by_kind() {
        let image = summarize(EMPTY_JSON, InvocationKind::Image);
        assert_eq!(image.total_objects, 0);
        assert_eq!(image.overall_threat_level, ThreatLevel::None);

        let stdout = r#"{"detections":[
            {"class":"divers","confidence":0.5,"threat_level":"low","bbox":[0,0,1,1]},
            {"class":"divers","confidence":0.8,"threat_level":"low","bbox":[0,0,2,2]}
        ],"frame_scores":[0.25,0.35],"total_objects":2}"#;
        let video = summarize(
            stdout,
            InvocationKind::Video {
                container: VideoContainer::Mp4,
                frame_stride: 1,
            },
        );
        assert_eq!(video.total_objects, 1);
        assert_eq!(video.detections[0].confidence, 0.8);
        assert_eq!(video.overall_threat_level, ThreatLevel::Low);
    }
}
