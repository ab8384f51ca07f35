use log::warn;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::common::errors::PipelineError;
use crate::models::detection::DetectionSummary;
use crate::models::media::{MediaKind, UploadedMedia};
use crate::models::response::ResponsePayload;
use crate::utils::{PathExt, data_uri, mime_for_extension};

/// Locates the artifact to return for this upload.
///
/// Images fall back to the original upload. Videos fall back to any file
/// with the expected extension inside the request's own output directory,
/// then fail.
pub async fn resolve_artifact(
    media: &UploadedMedia,
    output_path: &Path,
) -> Result<PathBuf, PipelineError> {
    if tokio::fs::try_exists(output_path).await.unwrap_or(false) {
        return Ok(output_path.to_path_buf());
    }

    match media.kind {
        MediaKind::Image => {
            warn!(
                "Detection output not found at {:?}, using original image",
                output_path
            );
            Ok(media.input_path.clone())
        }
        MediaKind::Video => {
            let recovered = match output_path.parent() {
                Some(dir) => scan_for_extension(dir, &output_path.ext_lower()).await,
                None => None,
            };
            match recovered {
                Some(path) => {
                    warn!(
                        "Detection output not found at {:?}, recovered {:?}",
                        output_path, path
                    );
                    Ok(path)
                }
                None => Err(PipelineError::ArtifactMissing {
                    kind: "video",
                    path: output_path.to_path_buf(),
                }),
            }
        }
    }
}

/// First regular file (by name) in `dir` with the given extension.
async fn scan_for_extension(dir: &Path, extension: &str) -> Option<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to scan {:?} for output artifacts: {}", dir, err);
            return None;
        }
    };

    let mut candidates = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                let is_file = entry
                    .file_type()
                    .await
                    .map(|ft| ft.is_file())
                    .unwrap_or(false);
                if is_file && path.ext_lower() == extension {
                    candidates.push(path);
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!("Failed to read entry in {:?}: {}", dir, err);
                break;
            }
        }
    }
    candidates.sort();
    candidates.into_iter().next()
}

/// Resolves the artifact for `output_path` and builds the payload from it.
pub async fn assemble(
    media: &UploadedMedia,
    summary: DetectionSummary,
    output_path: &Path,
    started: Instant,
) -> Result<ResponsePayload, PipelineError> {
    let artifact = resolve_artifact(media, output_path).await?;
    encode_payload(media, summary, &artifact, started).await
}

/// Reads the artifact, encodes it as a data URI and builds the payload.
pub async fn encode_payload(
    media: &UploadedMedia,
    summary: DetectionSummary,
    artifact: &Path,
    started: Instant,
) -> Result<ResponsePayload, PipelineError> {
    let bytes = tokio::fs::read(artifact).await.map_err(|source| {
        PipelineError::io(format!("Failed to read artifact {artifact:?}"), source)
    })?;

    let mime = mime_for_extension(&artifact.ext_lower())
        .filter(|mime| mime.starts_with(media.kind.as_str()))
        .unwrap_or_else(|| media.kind.fallback_mime().to_string());

    Ok(ResponsePayload::new(
        media.kind,
        media.original_filename.clone(),
        data_uri(&mime, &bytes),
        summary,
        started.elapsed().as_secs_f64(),
        media.request_id.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn media(dir: &Path, kind: MediaKind, name: &str) -> UploadedMedia {
        let input_path = dir.join(name);
        std::fs::write(&input_path, b"original-bytes").unwrap();
        let path = Path::new(name);
        UploadedMedia {
            request_id: Uuid::new_v4(),
            original_filename: name.to_string(),
            stem: path.file_stem().unwrap().to_string_lossy().into_owned(),
            extension: path.ext_lower(),
            kind,
            input_path,
        }
    }

    #[tokio::test]
    async fn image_without_output_uses_original() {
        let tmp = tempfile::tempdir().unwrap();
        let media = media(tmp.path(), MediaKind::Image, "reef.jpg");
        let output = tmp.path().join("out").join("detected_reef.jpg");

        let payload = assemble(&media, DetectionSummary::empty(), &output, Instant::now())
            .await
            .unwrap();

        assert_eq!(
            payload.detected_image.as_deref(),
            Some(data_uri("image/jpeg", b"original-bytes").as_str())
        );
        assert!(payload.detected_video.is_none());
        assert_eq!(payload.total_objects, 0);
    }

    #[tokio::test]
    async fn image_with_output_uses_annotated_bytes() {
        let tmp = tempfile::tempdir().unwrap();
        let media = media(tmp.path(), MediaKind::Image, "reef.png");
        let output = tmp.path().join("detected_reef.png");
        std::fs::write(&output, b"annotated").unwrap();

        let payload = assemble(&media, DetectionSummary::empty(), &output, Instant::now())
            .await
            .unwrap();

        assert_eq!(
            payload.detected_image.as_deref(),
            Some(data_uri("image/png", b"annotated").as_str())
        );
    }

    #[tokio::test]
    async fn video_recovers_from_own_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let input_dir = tmp.path().join("in");
        let output_dir = tmp.path().join("out");
        std::fs::create_dir_all(&input_dir).unwrap();
        std::fs::create_dir_all(&output_dir).unwrap();
        let media = media(&input_dir, MediaKind::Video, "dive.mov");
        std::fs::write(output_dir.join("dive_0.mp4"), b"v0").unwrap();
        std::fs::write(output_dir.join("notes.txt"), b"x").unwrap();

        let expected = output_dir.join("detected_dive.mp4");
        let found = resolve_artifact(&media, &expected).await.unwrap();
        assert_eq!(found, output_dir.join("dive_0.mp4"));
    }

    #[tokio::test]
    async fn video_without_any_output_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let media = media(tmp.path(), MediaKind::Video, "dive.mp4");
        let output_dir = tmp.path().join("out");
        std::fs::create_dir_all(&output_dir).unwrap();

        let err = assemble(
            &media,
            DetectionSummary::empty(),
            &output_dir.join("detected_dive.mp4"),
            Instant::now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactMissing { .. }));
    }
}
