use super::{word, ContentProvider, Lookup, ReadError};
use rust_embed::RustEmbed;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Files shipped inside the binary, addressed by their path under `resources/`.
#[derive(RustEmbed)]
#[folder = "resources/"]
struct BundledResources;

/// Reads from the local filesystem, extracting text from Word documents.
pub struct FilesystemProvider;

impl ContentProvider for FilesystemProvider {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn try_resolve(&self, raw: &str) -> Lookup {
        let path = Path::new(raw);
        let display = std::path::absolute(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string();

        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Lookup::Missing(format!("filesystem: {} does not exist", display));
            }
            Err(e) => {
                return Lookup::Missing(format!("filesystem: {} is inaccessible ({})", display, e));
            }
        };

        if !is_readable(path, &metadata) {
            return Lookup::Failed(ReadError::NotReadable { path: display });
        }

        if is_word_document(path) {
            return match word::extract_text(path) {
                Ok(text) => Lookup::Found(text),
                Err(reason) => Lookup::Failed(ReadError::WordExtraction {
                    path: display,
                    reason,
                }),
            };
        }

        match fs::read_to_string(path) {
            Ok(text) => Lookup::Found(text),
            Err(e) => Lookup::Missing(format!("filesystem: {} could not be read ({})", display, e)),
        }
    }
}

fn is_word_document(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().ends_with(".docx"))
        .unwrap_or(false)
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn is_readable(path: &Path, metadata: &fs::Metadata) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // no read bit for anyone; root would otherwise bypass this
        if metadata.permissions().mode() & 0o444 == 0 {
            return false;
        }
    }

    !matches!(fs::File::open(path), Err(e) if e.kind() == ErrorKind::PermissionDenied)
}

/// Looks the path up among the bundled resources.
pub struct BundledResourceProvider;

impl ContentProvider for BundledResourceProvider {
    fn name(&self) -> &'static str {
        "bundled"
    }

    fn try_resolve(&self, path: &str) -> Lookup {
        match BundledResources::get(path) {
            Some(file) => Lookup::Found(String::from_utf8_lossy(&file.data).into_owned()),
            None => Lookup::Missing(format!("bundled resources: no resource named '{}'", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_detection_is_case_insensitive() {
        assert!(is_word_document(Path::new("/tmp/a.docx")));
        assert!(is_word_document(Path::new("/tmp/A.DocX")));
        assert!(!is_word_document(Path::new("/tmp/a.doc")));
        assert!(!is_word_document(Path::new("/tmp/docx.txt")));
    }

    #[test]
    fn test_bundled_lookup() {
        let provider = BundledResourceProvider;
        assert!(matches!(provider.try_resolve("guides/tool-calling.md"), Lookup::Found(_)));
        assert!(matches!(provider.try_resolve("guides/nope.md"), Lookup::Missing(_)));
    }

    #[test]
    fn test_filesystem_missing_reports_absolute_path() {
        let Lookup::Missing(attempt) = FilesystemProvider.try_resolve("no-such-file.txt") else {
            panic!("expected a miss");
        };
        assert!(attempt.starts_with("filesystem:"));
        assert!(attempt.contains(&std::env::current_dir().unwrap().display().to_string()));
    }
}
