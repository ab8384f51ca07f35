use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Discrete severity bucket derived from a continuous threat score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ThreatLevel {
    #[default]
    None,
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Buckets a score in `[0, 1]`. Callers with zero detections should use
    /// [`ThreatLevel::None`] instead.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ThreatLevel::Critical
        } else if score >= 0.6 {
            ThreatLevel::High
        } else if score >= 0.4 {
            ThreatLevel::Medium
        } else if score >= 0.2 {
            ThreatLevel::Low
        } else {
            ThreatLevel::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "NONE",
            ThreatLevel::Minimal => "MINIMAL",
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(ThreatLevel::None),
            "MINIMAL" => Ok(ThreatLevel::Minimal),
            "LOW" => Ok(ThreatLevel::Low),
            "MEDIUM" => Ok(ThreatLevel::Medium),
            "HIGH" => Ok(ThreatLevel::High),
            "CRITICAL" => Ok(ThreatLevel::Critical),
            other => Err(format!("unknown threat level: {other}")),
        }
    }
}

impl TryFrom<String> for ThreatLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// `[x, y, width, height]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<[f64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x, bbox.y, bbox.width, bbox.height]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f64,
    pub threat_level: ThreatLevel,
    pub bbox: BoundingBox,
}

/// Detector output as printed on stdout. Every field is optional on the wire
/// so that partial objects still decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    #[serde(default)]
    pub detections: Vec<RawDetection>,
    #[serde(default)]
    pub total_objects: usize,
    #[serde(default)]
    pub overall_threat_level: ThreatLevel,
    #[serde(default)]
    pub overall_threat_score: f64,
    #[serde(default)]
    pub threat_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    /// Per-frame scores of frames that produced detections (video only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_scores: Option<Vec<f64>>,
}

impl DetectionSummary {
    /// The summary reported when nothing was detected or the output could not
    /// be interpreted.
    pub fn empty() -> Self {
        Self {
            detections: Vec::new(),
            total_objects: 0,
            overall_threat_level: ThreatLevel::None,
            overall_threat_score: 0.0,
            threat_count: 0,
            frame_count: None,
            frame_scores: None,
        }
    }

    /// Re-establishes the count and level invariants for a single image.
    pub fn normalize_image(mut self) -> Self {
        if self.detections.is_empty() {
            return Self {
                frame_count: self.frame_count,
                ..Self::empty()
            };
        }
        self.overall_threat_score = clamp_score(self.overall_threat_score);
        self.total_objects = self.detections.len();
        self.threat_count = self.threat_count.min(self.total_objects);
        self.overall_threat_level = ThreatLevel::from_score(self.overall_threat_score);
        self
    }

    /// Collapses the per-frame detections of a video into one entry per class
    /// and averages the per-frame scores.
    pub fn normalize_video(mut self) -> Self {
        self.detections = dedupe_by_class(std::mem::take(&mut self.detections));
        if let Some(scores) = self.frame_scores.as_deref() {
            if !scores.is_empty() {
                self.overall_threat_score = scores.iter().sum::<f64>() / scores.len() as f64;
            }
        }
        if self.detections.is_empty() {
            return Self {
                frame_count: self.frame_count,
                ..Self::empty()
            };
        }
        self.overall_threat_score = clamp_score(self.overall_threat_score);
        self.total_objects = self.detections.len();
        self.threat_count = self.total_objects;
        self.overall_threat_level = ThreatLevel::from_score(self.overall_threat_score);
        self
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Keeps the highest-confidence detection per class, at the position where
/// the class first appeared.
pub fn dedupe_by_class(detections: Vec<RawDetection>) -> Vec<RawDetection> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<RawDetection> = Vec::with_capacity(detections.len());

    for detection in detections {
        match slots.get(&detection.class_label) {
            Some(&index) => {
                if detection.confidence > kept[index].confidence {
                    kept[index] = detection;
                }
            }
            None => {
                slots.insert(detection.class_label.clone(), kept.len());
                kept.push(detection);
            }
        }
    }

    kept
}
