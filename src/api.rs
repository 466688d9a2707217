//! HTTP surface for the PDF question-answering tool.
//!
//! - `GET /` – The page: upload control, question input, instructions.
//! - `POST /` – Submit the form (`file`, `question`) and render the routed answer.
//! - `POST /api/ask` – Same form, JSON response `{ "answer", "tool", "reason" }`.
//! - `GET /metrics` – Counters for answered questions, routes taken, and failures.
//!
//! Each submission is handled by one explicit handler call; nothing is re-executed implicitly.
//! Missing inputs are answered with an instructional message and never reach the pipeline.

mod page;

use crate::document::Upload;
use crate::metrics::MetricsSnapshot;
use crate::processing::{PipelineError, QaApi};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use page::{Notice, QUESTION_PROMPT, UPLOAD_PROMPT, render_page};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router around a question-answering service.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: QaApi + 'static,
{
    Router::new()
        .route("/", get(show_form).post(submit_form::<S>))
        .route("/api/ask", post(ask_json::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Fields collected from one multipart submission.
#[derive(Debug, Default)]
struct FormInput {
    upload: Option<Upload>,
    question: String,
}

/// Reason a submission did not reach the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingInput {
    File,
    Question,
}

impl MissingInput {
    fn message(self) -> &'static str {
        match self {
            Self::File => UPLOAD_PROMPT,
            Self::Question => QUESTION_PROMPT,
        }
    }
}

impl FormInput {
    async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut input = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    let upload = Upload::new(filename, bytes.to_vec());
                    input.upload = (!upload.is_empty()).then_some(upload);
                }
                Some("question") => input.question = field.text().await?,
                other => tracing::debug!(field = ?other, "Ignoring unknown form field"),
            }
        }
        Ok(input)
    }

    /// The file is checked first, then the question.
    fn validate(self) -> Result<(Upload, String), MissingInput> {
        let upload = self.upload.ok_or(MissingInput::File)?;
        let question = self.question.trim().to_string();
        if question.is_empty() {
            return Err(MissingInput::Question);
        }
        Ok((upload, question))
    }
}

async fn show_form() -> Html<String> {
    Html(render_page("", Notice::Info(UPLOAD_PROMPT)))
}

/// Handle one form submission and render the resulting page.
async fn submit_form<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Html<String>, AppError>
where
    S: QaApi,
{
    let input = FormInput::read(multipart).await?;
    let question = input.question.clone();
    let (upload, question_text) = match input.validate() {
        Ok(valid) => valid,
        Err(missing) => {
            tracing::debug!(?missing, "Form submitted without required input");
            return Ok(Html(render_page(&question, Notice::Info(missing.message()))));
        }
    };

    match service.ask(upload, &question_text).await {
        Ok(routed) => Ok(Html(render_page(
            &question,
            Notice::Answer {
                tool: routed.selection.capability.tool_name(),
                markdown: &routed.answer,
            },
        ))),
        Err(error) => Err(AppError::Page {
            question,
            error,
        }),
    }
}

/// Success response for `POST /api/ask`.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
    tool: &'static str,
    reason: String,
}

async fn ask_json<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<AskResponse>, AppError>
where
    S: QaApi,
{
    let (upload, question) = FormInput::read(multipart)
        .await?
        .validate()
        .map_err(AppError::Missing)?;
    let routed = service
        .ask(upload, &question)
        .await
        .map_err(AppError::Json)?;
    Ok(Json(AskResponse {
        answer: routed.answer,
        tool: routed.selection.capability.tool_name(),
        reason: routed.selection.reason,
    }))
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: QaApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    Multipart(MultipartError),
    Missing(MissingInput),
    Page {
        question: String,
        error: PipelineError,
    },
    Json(PipelineError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Multipart(error) => (error.status(), error.body_text()).into_response(),
            Self::Missing(missing) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": missing.message() })),
            )
                .into_response(),
            Self::Page { question, error } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_page(&question, Notice::Error(&error.to_string()))),
            )
                .into_response(),
            Self::Json(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(inner: MultipartError) -> Self {
        Self::Multipart(inner)
    }
}
