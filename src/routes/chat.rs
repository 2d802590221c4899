use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    routing::post,
    Router,
};
use futures::StreamExt;
use std::convert::Infallible;
use tracing::info;

use crate::chat::{self, AnswerStream};
use crate::models::{AppState, UploadRequest};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/testTool/chat/upload/stream", post(upload_stream))
        .route(
            "/api/testTool/chat/upload/stream-with-tool",
            post(upload_stream_with_tool),
        )
        .with_state(state)
}

/// Answer a question about an uploaded file by embedding its content.
async fn upload_stream(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let answer = match read_upload(multipart).await {
        Ok(upload) => {
            info!(file_name = %upload.file_name, "Received upload for direct answer");
            chat::answer_with_content(&state.chat, upload)
        }
        Err(e) => chat::direct_failure(&e),
    };
    into_sse(answer)
}

/// Answer a question about an uploaded file through the file reader tool.
async fn upload_stream_with_tool(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let answer = match read_upload(multipart).await {
        Ok(upload) => {
            info!(file_name = %upload.file_name, "Received upload for tool-mediated answer");
            let scratch_dir = state.config.upload.scratch_dir();
            chat::answer_with_tool(&state.chat, &scratch_dir, upload).await
        }
        Err(e) => chat::tool_failure(&e),
    };
    into_sse(answer)
}

async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> AppResult<UploadRequest> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let mut file = None;
    let mut question = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
                file = Some((file_name, bytes));
            }
            Some("question") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
                question = Some(text);
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file
        .ok_or_else(|| AppError::InvalidRequest("missing multipart field 'file'".to_string()))?;
    let question = question
        .ok_or_else(|| AppError::InvalidRequest("missing multipart field 'question'".to_string()))?;

    Ok(UploadRequest {
        file_name,
        bytes,
        question,
    })
}

fn into_sse(answer: AnswerStream) -> impl IntoResponse {
    // SSE fields cannot carry bare carriage returns
    let events = answer.map(|chunk| Ok::<_, Infallible>(Event::default().data(chunk.replace('\r', ""))));
    Sse::new(events).keep_alive(KeepAlive::default())
}
