use anyhow::anyhow;
use rocket::State;
use rocket::form::{Errors, Form, FromForm};
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::post;
use rocket::serde::json::Json;

use crate::api::{AppError, AppResult};
use crate::background::flows::detection_workflow;
use crate::background::processors::workspace::Workspace;
use crate::common::errors::PipelineError;
use crate::config::DetectorConfig;
use crate::models::response::ResponsePayload;

#[derive(FromForm, Debug)]
pub struct DetectionForm<'r> {
    /// The uploaded image or video.
    #[field(name = "file")]
    pub file: Option<TempFile<'r>>,

    /// `image` or `video`; inferred from the extension when absent.
    #[field(name = "type")]
    pub kind: Option<String>,
}

#[post("/api/detection/process", data = "<form>")]
pub async fn process_detection(
    config: &State<DetectorConfig>,
    workspace: &State<Workspace>,
    form: Result<Form<DetectionForm<'_>>, Errors<'_>>,
) -> AppResult<Json<ResponsePayload>> {
    let mut inner_form = match form {
        Ok(form) => form.into_inner(),
        Err(errors) => {
            let error_chain = errors
                .iter()
                .map(|e| anyhow!(e.to_string()))
                .reduce(|acc, e| acc.context(e.to_string()));

            let error = match error_chain {
                Some(chain) => chain.context("Failed to parse form"),
                None => anyhow!("Failed to parse form with unknown error"),
            };
            return Err(AppError {
                status: Status::BadRequest,
                error,
            });
        }
    };

    let file = inner_form
        .file
        .as_mut()
        .ok_or_else(|| PipelineError::validation("No file provided"))?;

    let payload = detection_workflow(
        file,
        inner_form.kind.as_deref(),
        config.inner(),
        workspace.inner(),
    )
    .await?;

    Ok(Json(payload))
}
