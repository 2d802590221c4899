// Prompt templates for the upload endpoints

use std::path::Path;

/// Prompt that embeds the whole file.
pub fn with_content(file_name: &str, content: &str, question: &str) -> String {
    format!(
        "File '{}' content:\n\n{}\n\nAnswer the question based on the above: {}",
        file_name, content, question
    )
}

/// Prompt that points the model at a file it has to read with a tool.
pub fn with_file_reference(path: &Path, question: &str) -> String {
    format!(
        "The file path is: {}\nRead the content of this file, then answer the question: {}",
        path.display(),
        question
    )
}
