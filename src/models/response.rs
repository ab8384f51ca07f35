use serde::Serialize;

use crate::models::detection::{DetectionSummary, RawDetection, ThreatLevel};
use crate::models::media::MediaKind;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub success: bool,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub original_file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_video: Option<String>,
    pub detections: Vec<RawDetection>,
    pub total_objects: usize,
    pub overall_threat_level: ThreatLevel,
    pub overall_threat_score: f64,
    pub threat_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    /// Seconds from upload receipt to payload assembly.
    pub processing_time: f64,
    pub request_id: String,
}

impl ResponsePayload {
    pub fn new(
        kind: MediaKind,
        original_file_name: String,
        data_uri: String,
        summary: DetectionSummary,
        processing_time: f64,
        request_id: String,
    ) -> Self {
        let (detected_image, detected_video) = match kind {
            MediaKind::Image => (Some(data_uri), None),
            MediaKind::Video => (None, Some(data_uri)),
        };
        Self {
            success: true,
            kind,
            original_file_name,
            detected_image,
            detected_video,
            total_objects: summary.detections.len(),
            detections: summary.detections,
            overall_threat_level: summary.overall_threat_level,
            overall_threat_score: summary.overall_threat_score,
            threat_count: summary.threat_count,
            frame_count: summary.frame_count,
            processing_time,
            request_id,
        }
    }
}
