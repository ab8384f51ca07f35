use base64::Engine as _;
use base64::engine::general_purpose;
use rocket::http::ContentType;
use std::path::Path;

pub trait PathExt {
    fn ext_lower(&self) -> String;
}

impl PathExt for Path {
    fn ext_lower(&self) -> String {
        self.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// MIME type for a file extension, if Rocket knows it.
pub fn mime_for_extension(ext: &str) -> Option<String> {
    ContentType::from_extension(ext).map(|ct| ct.to_string())
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_lower_normalizes_case() {
        assert_eq!(Path::new("a/B.JPG").ext_lower(), "jpg");
        assert_eq!(Path::new("noext").ext_lower(), "");
    }

    #[test]
    fn data_uri_encodes_bytes() {
        assert_eq!(data_uri("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn known_mime_types() {
        assert_eq!(mime_for_extension("png").as_deref(), Some("image/png"));
        assert_eq!(mime_for_extension("mp4").as_deref(), Some("video/mp4"));
        assert_eq!(mime_for_extension("definitely-not-a-type"), None);
    }
}
