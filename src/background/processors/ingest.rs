use log::info;
use rocket::fs::TempFile;
use std::path::Path;

use crate::background::processors::workspace::RequestWorkspace;
use crate::common::errors::PipelineError;
use crate::models::media::{MediaKind, UploadedMedia};
use crate::utils::PathExt;

/// Naming and kind of an upload, resolved before anything touches disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUpload {
    pub original_filename: String,
    pub stem: String,
    pub extension: String,
    pub kind: MediaKind,
}

/// Validates the client-supplied name and `type` field.
///
/// `fallback_extension` comes from the part's content type and is only
/// consulted when the filename carries no extension.
pub fn resolve_upload(
    raw_name: Option<&str>,
    fallback_extension: Option<&str>,
    declared_kind: Option<&str>,
) -> Result<ResolvedUpload, PipelineError> {
    let original_filename = raw_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PipelineError::validation("No file provided"))?
        .to_string();

    // Browsers may send a full client path; only the last component matters.
    let base_name = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(&original_filename);
    let path = Path::new(base_name);

    let extension = match path.ext_lower() {
        ext if !ext.is_empty() => ext,
        _ => fallback_extension
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                PipelineError::validation(format!(
                    "Cannot determine file type of '{original_filename}'"
                ))
            })?,
    };

    let kind = match declared_kind.map(str::trim).filter(|k| !k.is_empty()) {
        Some(declared) => declared
            .parse::<MediaKind>()
            .map_err(PipelineError::Validation)?,
        None => MediaKind::from_extension(&extension).ok_or_else(|| {
            PipelineError::validation(format!("Invalid file type: {extension}"))
        })?,
    };

    if !kind.accepts_extension(&extension) {
        return Err(PipelineError::validation(format!(
            "Invalid file type for {kind}: {extension}"
        )));
    }

    let stem = sanitize_stem(
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default(),
    );

    Ok(ResolvedUpload {
        original_filename,
        stem,
        extension,
        kind,
    })
}

/// Reduces a client filename stem to characters safe on every filesystem.
pub fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.chars().take(128).collect()
    }
}

/// Persists the multipart file into the request's input directory.
pub async fn ingest(
    file: &mut TempFile<'_>,
    declared_kind: Option<&str>,
    request: &RequestWorkspace,
) -> Result<UploadedMedia, PipelineError> {
    let raw_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string());
    let content_extension = file
        .content_type()
        .and_then(|ct| ct.extension())
        .map(|ext| ext.as_str().to_string());

    let resolved = resolve_upload(
        raw_name.as_deref(),
        content_extension.as_deref(),
        declared_kind,
    )?;

    let input_path = request.input_path(&resolved.stem, &resolved.extension);
    file.move_copy_to(&input_path).await.map_err(|source| {
        PipelineError::io(format!("Failed to save upload to {input_path:?}"), source)
    })?;

    info!(
        "Received {} '{}' ({} bytes) for request {}",
        resolved.kind,
        resolved.original_filename,
        file.len(),
        request.id
    );

    Ok(UploadedMedia {
        request_id: request.id,
        original_filename: resolved.original_filename,
        stem: resolved.stem,
        extension: resolved.extension,
        kind: resolved.kind,
        input_path,
    })
}
