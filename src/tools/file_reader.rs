use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{Tool, ToolOutput};
use crate::documents::FileReader;
use crate::types::ToolDefinition;

pub const READ_FILE_TOOL: &str = "readFileAndPrint";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileArgs {
    pub file_path: String,
}

/// Exposes [`FileReader`] to the model.
#[derive(Clone)]
pub struct FileReaderTool {
    reader: Arc<FileReader>,
}

impl Default for FileReaderTool {
    fn default() -> Self {
        Self::new(FileReader::default())
    }
}

impl FileReaderTool {
    pub fn new(reader: FileReader) -> Self {
        Self {
            reader: Arc::new(reader),
        }
    }
}

#[async_trait]
impl Tool for FileReaderTool {
    type Args = ReadFileArgs;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: READ_FILE_TOOL.to_string(),
            description: "Read a file and print its content. Supports text files \
                (.txt, .md, .java, .py, etc.) and Word documents (.docx)"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "filePath": {
                        "type": "string",
                        "description": "Absolute or relative path of the file to read"
                    }
                },
                "required": ["filePath"]
            }),
        }
    }

    async fn call(&self, args: ReadFileArgs) -> ToolOutput {
        let reader = self.reader.clone();
        let path = args.file_path;

        match tokio::task::spawn_blocking(move || reader.read(&path)).await {
            Ok(result) => ToolOutput::from(result),
            Err(e) => ToolOutput::failure(format!("File reader task failed: {}", e)),
        }
    }
}
