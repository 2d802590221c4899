//! Document Reading
//!
//! Resolves a path to text by asking a prioritized list of content providers:
//!
//! 1. **Filesystem** - plain text files and Word (`.docx`) documents
//! 2. **Bundled resources** - files compiled into the binary from `resources/`
//!
//! The first provider that produces content wins. A provider can also stop the
//! chain with a terminal error (for example a file that exists but cannot be
//! read), in which case later providers are not consulted.

pub mod providers;
pub mod word;

pub use providers::{BundledResourceProvider, FilesystemProvider};

use tracing::{debug, info, warn};

/// Why a document could not be read. `Display` is the message handed back to
/// the model, so it must stand on its own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadError {
    #[error("File is not readable: {path}")]
    NotReadable { path: String },

    #[error("Failed to read Word document {path}: {reason}")]
    WordExtraction { path: String, reason: String },

    #[error("File not found: {path} ({})", .attempts.join("; "))]
    NotFound { path: String, attempts: Vec<String> },
}

/// Outcome of one provider's lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(String),
    /// Not resolvable here; the description records what was tried.
    Missing(String),
    /// Stop the chain with this error.
    Failed(ReadError),
}

pub trait ContentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_resolve(&self, path: &str) -> Lookup;
}

pub struct FileReader {
    providers: Vec<Box<dyn ContentProvider>>,
}

impl Default for FileReader {
    fn default() -> Self {
        Self::with_providers(vec![
            Box::new(FilesystemProvider),
            Box::new(BundledResourceProvider),
        ])
    }
}

impl FileReader {
    pub fn with_providers(providers: Vec<Box<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    /// Read `path` through the provider chain. Blocking; call from
    /// `spawn_blocking` inside async code.
    pub fn read(&self, path: &str) -> Result<String, ReadError> {
        info!(path = %path, "Reading file");

        let mut attempts = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            match provider.try_resolve(path) {
                Lookup::Found(content) => {
                    info!(
                        path = %path,
                        provider = provider.name(),
                        chars = content.chars().count(),
                        "File read"
                    );
                    return Ok(content);
                }
                Lookup::Missing(attempt) => {
                    debug!(path = %path, provider = provider.name(), attempt = %attempt, "Falling through");
                    attempts.push(attempt);
                }
                Lookup::Failed(error) => {
                    warn!(path = %path, provider = provider.name(), error = %error, "File read failed");
                    return Err(error);
                }
            }
        }

        let error = ReadError::NotFound {
            path: path.to_string(),
            attempts,
        };
        warn!(error = %error, "File not found in any location");
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rust::document::{Hyperlink, Paragraph, Run, Table, TableRow};
    use docx_rust::Docx;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    impl ContentProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn try_resolve(&self, _path: &str) -> Lookup {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Lookup::Found("from fallback".to_string())
        }
    }

    fn reader_with_counter() -> (FileReader, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let reader = FileReader::with_providers(vec![
            Box::new(FilesystemProvider),
            Box::new(CountingProvider {
                calls: calls.clone(),
            }),
        ]);
        (reader, calls)
    }

    #[test]
    fn test_reads_plain_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\nline two").unwrap();

        let content = FileReader::default().read(path.to_str().unwrap()).unwrap();
        assert_eq!(content, "# Notes\nline two");
    }

    #[test]
    fn test_reads_docx_paragraph_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Report.DOCX");

        let mut docx = Docx::default();
        docx.document.push(Paragraph::default().push_text("Quarterly report"));
        docx.document.push(Paragraph::default().push_text("Revenue grew 12%"));
        docx.write_file(&path).unwrap();

        let content = FileReader::default().read(path.to_str().unwrap()).unwrap();
        assert!(content.contains("Quarterly report"));
        assert!(content.contains("Revenue grew 12%"));
        assert!(!content.starts_with("PK"), "raw zip bytes leaked: {content:?}");
    }

    #[test]
    fn test_reads_docx_links_and_tables() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runbook.docx");

        let mut docx = Docx::default();
        docx.document.push(
            Paragraph::default()
                .push_text("Escalate via ")
                .push(Hyperlink::default().content(Run::default().push_text("the on-call page"))),
        );
        docx.document.push(Table::default().push_row(
            TableRow::default().push_cell(Paragraph::default().push_text("Severity 1")),
        ));
        docx.write_file(&path).unwrap();

        let content = FileReader::default().read(path.to_str().unwrap()).unwrap();
        assert!(content.contains("Escalate via the on-call page"), "{content:?}");
        assert!(content.contains("Severity 1"), "{content:?}");
    }

    #[test]
    fn test_corrupt_docx_is_terminal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "this is not a zip archive").unwrap();

        let (reader, calls) = reader_with_counter();
        let err = reader.read(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ReadError::WordExtraction { .. }));
        assert!(err.to_string().starts_with("Failed to read Word document"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_everywhere_names_both_locations() {
        let err = FileReader::default()
            .read("/definitely/not/here/missing.txt")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/definitely/not/here/missing.txt"));
        assert!(message.contains("filesystem"), "{message}");
        assert!(message.contains("bundled resources"), "{message}");
    }

    #[test]
    fn test_missing_file_falls_back_to_bundled_resource() {
        let content = FileReader::default().read("guides/tool-calling.md").unwrap();
        assert!(content.contains("readFileAndPrint"));
    }

    #[test]
    fn test_undecodable_text_falls_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let (reader, calls) = reader_with_counter();
        let content = reader.read(path.to_str().unwrap()).unwrap();
        assert_eq!(content, "from fallback");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_skips_fallback() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.txt");
        std::fs::write(&path, "top secret").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        let (reader, calls) = reader_with_counter();
        let err = reader.read(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ReadError::NotReadable { .. }));
        assert!(err.to_string().contains("secret.txt"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
    }
}
