//! Upload-and-Answer flows
//!
//! - **Direct**: the uploaded file is decoded and embedded in the prompt.
//! - **Tool-mediated**: the upload is written to a scratch file, the prompt only
//!   names its path, and the model reads it with the `readFileAndPrint` tool.
//!   The scratch file lives exactly as long as the answer stream.
//!
//! Both flows always produce a stream of text. Failures become a message in
//! that stream instead of an error.

pub mod prompt;
pub mod scratch;

pub use scratch::ScratchFile;

use futures::stream::{self, BoxStream, StreamExt};
use std::path::Path;
use tracing::{error, info, warn};

use crate::llm::ChatClient;
use crate::models::UploadRequest;
use crate::types::{AppError, AppResult};

pub type AnswerStream = BoxStream<'static, String>;

/// Answer with the file's content embedded in the prompt.
pub fn answer_with_content(client: &ChatClient, upload: UploadRequest) -> AnswerStream {
    let prompt = match content_prompt(&upload) {
        Ok(prompt) => prompt,
        Err(e) => return direct_failure(&e),
    };

    info!(
        file_name = %upload.file_name,
        size = upload.bytes.len(),
        "Answering with embedded file content"
    );
    forward(client.stream(prompt, false))
}

fn content_prompt(upload: &UploadRequest) -> AppResult<String> {
    let content = std::str::from_utf8(&upload.bytes)
        .map_err(|e| AppError::InvalidRequest(format!("file is not valid UTF-8 text: {}", e)))?;
    Ok(prompt::with_content(&upload.file_name, content, &upload.question))
}

/// Answer by letting the model read a scratch copy of the file through a tool.
pub async fn answer_with_tool(
    client: &ChatClient,
    scratch_dir: &Path,
    upload: UploadRequest,
) -> AnswerStream {
    let scratch = match ScratchFile::persist(scratch_dir, &upload.file_name, &upload.bytes).await {
        Ok(scratch) => scratch,
        Err(e) => return tool_failure(&e),
    };

    info!(
        file_name = %upload.file_name,
        path = %scratch.path().display(),
        "Answering through the file reader tool"
    );
    let prompt = prompt::with_file_reference(scratch.path(), &upload.question);
    scratch.attach(forward(client.stream(prompt, true)))
}

/// Single-message stream for a failed direct request.
pub fn direct_failure(error: &AppError) -> AnswerStream {
    warn!(error = %error, "Direct upload request failed");
    single(format!("Failed to read file: {}", error))
}

/// Single-message stream for a failed tool-mediated request.
pub fn tool_failure(error: &AppError) -> AnswerStream {
    warn!(error = %error, "Tool upload request failed");
    single(format!("Processing failed: {}", error))
}

fn single(message: String) -> AnswerStream {
    stream::once(async move { message }).boxed()
}

fn forward(answer: BoxStream<'static, AppResult<String>>) -> AnswerStream {
    answer
        .map(|item| match item {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(error = %e, "Chat stream failed");
                format!("Chat stream failed: {}", e)
            }
        })
        .boxed()
}
