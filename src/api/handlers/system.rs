use rocket::State;
use rocket::get;
use rocket::serde::json::Json;
use serde::Serialize;

use crate::api::AppResult;
use crate::background::processors::setup::interpreter_version;
use crate::config::DetectorConfig;
use crate::models::media::VideoContainer;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub interpreter: Option<String>,
    pub model_present: bool,
    pub confidence_threshold: f32,
    pub video_container: VideoContainer,
}

#[get("/api/health")]
pub async fn health(config: &State<DetectorConfig>) -> AppResult<Json<HealthReport>> {
    let config = config.inner().clone();
    let report = tokio::task::spawn_blocking(move || HealthReport {
        status: "ok",
        interpreter: interpreter_version(&config.python_path),
        model_present: config.model_path.is_file(),
        confidence_threshold: config.confidence_threshold,
        video_container: config.video_container,
    })
    .await?;
    Ok(Json(report))
}
