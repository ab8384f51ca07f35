use log::{error, info, warn};
use rocket::fs::TempFile;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::background::actors::file_ops::delete::CleanupTask;
use crate::background::processors::assembler::assemble;
use crate::background::processors::ingest::ingest;
use crate::background::processors::invoker::{DetectionInvocation, invoke};
use crate::background::processors::parser::summarize;
use crate::background::processors::workspace::{RequestWorkspace, Workspace};
use crate::common::errors::PipelineError;
use crate::config::DetectorConfig;
use crate::models::response::ResponsePayload;

/// Runs one upload through the detector and returns the response payload.
///
/// Everything staged for the request is removed before returning, whether
/// or not the run succeeded.
pub async fn detection_workflow(
    file: &mut TempFile<'_>,
    declared_kind: Option<&str>,
    config: &DetectorConfig,
    workspace: &Workspace,
) -> Result<ResponsePayload, PipelineError> {
    let started = Instant::now();

    // Step 1: Request workspace
    let request = workspace.request(Uuid::new_v4()).await?;

    let mut cleanup = CleanupTask::new();
    let result = run_stages(file, declared_kind, config, &request, started, &mut cleanup).await;

    // Step 6: Cleanup, on every exit path
    cleanup.dir(&request.input_dir).dir(&request.output_dir);
    let failures = cleanup.run().await;
    if failures > 0 {
        warn!(
            "Cleanup left {} path(s) behind for request {}",
            failures, request.id
        );
    }

    match &result {
        Ok(payload) => info!(duration = &*format!("{:?}", started.elapsed());
            "Request {} done: {} objects, threat level {}",
            request.id,
            payload.total_objects,
            payload.overall_threat_level
        ),
        Err(err) => error!("Request {} failed: {}", request.id, err),
    }

    result
}

async fn run_stages(
    file: &mut TempFile<'_>,
    declared_kind: Option<&str>,
    config: &DetectorConfig,
    request: &RequestWorkspace,
    started: Instant,
    cleanup: &mut CleanupTask,
) -> Result<ResponsePayload, PipelineError> {
    // Step 2: Persist upload
    let media = ingest(file, declared_kind, request).await?;
    cleanup.file(&media.input_path);

    // Step 3: Run detector
    let invocation = DetectionInvocation::build(&media, request, config);
    if let Some(script) = invocation.generated_script() {
        cleanup.file(script);
    }
    cleanup.file(&invocation.output_path);
    invocation.stage_script().await?;

    let timeout = config.detector_timeout_secs.map(Duration::from_secs);
    let stdout = invoke(&invocation, timeout)
        .await?
        .into_stdout(invocation.kind)?;

    // Step 4: Interpret results
    let summary = summarize(&stdout, invocation.kind);

    // Step 5: Assemble response
    assemble(&media, summary, &invocation.output_path, started).await
}
