use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::common::{VALID_IMAGE_EXTENSIONS, VALID_VIDEO_EXTENSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        if VALID_IMAGE_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Image)
        } else if VALID_VIDEO_EXTENSIONS.contains(&ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        match self {
            MediaKind::Image => VALID_IMAGE_EXTENSIONS.contains(&ext),
            MediaKind::Video => VALID_VIDEO_EXTENSIONS.contains(&ext),
        }
    }

    /// MIME type used when the artifact extension is unknown.
    pub fn fallback_mime(&self) -> &'static str {
        match self {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("Unsupported media type: {other}")),
        }
    }
}

/// Container the video driver writes annotated frames into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    #[default]
    Mp4,
    Avi,
}

impl VideoContainer {
    pub fn extension(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4",
            VideoContainer::Avi => "avi",
        }
    }

    pub fn fourcc(&self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4v",
            VideoContainer::Avi => "XVID",
        }
    }
}

/// An upload staged in the request workspace.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub request_id: Uuid,
    /// Name as sent by the client, reported back verbatim.
    pub original_filename: String,
    /// Sanitized stem used for every file derived from this upload.
    pub stem: String,
    /// Lowercase extension without the dot.
    pub extension: String,
    pub kind: MediaKind,
    pub input_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(MediaKind::from_extension("jpeg"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("mov"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn kind_parses_form_values() {
        assert_eq!("image".parse::<MediaKind>(), Ok(MediaKind::Image));
        assert_eq!("VIDEO".parse::<MediaKind>(), Ok(MediaKind::Video));
        assert!("audio".parse::<MediaKind>().is_err());
    }

    #[test]
    fn container_codecs() {
        assert_eq!(VideoContainer::Mp4.fourcc(), "mp4v");
        assert_eq!(VideoContainer::Avi.extension(), "avi");
        assert_eq!(VideoContainer::default(), VideoContainer::Mp4);
    }
}
