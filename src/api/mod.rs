pub mod handlers;

use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use serde_json::json;
use std::io::Cursor;

use crate::common::errors::PipelineError;

#[derive(Debug)]
pub struct AppError {
    pub status: Status,
    pub error: anyhow::Error,
}

impl AppError {
    fn pipeline_error(&self) -> Option<&PipelineError> {
        self.error
            .chain()
            .find_map(|cause| cause.downcast_ref::<PipelineError>())
    }
}

#[rocket::async_trait]
impl<'r, 'o: 'r> Responder<'r, 'o> for AppError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'o> {
        let outer_msg = self.error.to_string();

        let chain: Vec<String> = self.error.chain().map(|e| e.to_string()).collect();

        let mut body = json!({
            "error": outer_msg,
            "chain": chain,
        });
        if let Some(details) = self.pipeline_error().and_then(PipelineError::details) {
            body["details"] = json!(details);
        }
        let body = body.to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl<E> From<E> for AppError
where
    anyhow::Error: From<E>,
{
    fn from(err: E) -> Self {
        let error = anyhow::Error::from(err);
        // Status follows the first pipeline error in the chain.
        let status = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<PipelineError>())
            .map(PipelineError::status)
            .unwrap_or(Status::InternalServerError);
        AppError { status, error }
    }
}

pub type AppResult<T> = Result<T, AppError>;
