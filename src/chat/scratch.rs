// Per-request scratch files for the tool-mediated flow

use futures::stream::{BoxStream, Stream, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{AppError, AppResult};

/// A file written for one request and removed when this guard is dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Write `bytes` to `<dir>/<file name>`, overwriting any existing file.
    /// Only the final component of `file_name` is used.
    pub async fn persist(dir: &Path, file_name: &str, bytes: &[u8]) -> AppResult<Self> {
        let scratch = Self::claim(dir, file_name)?;

        // on failure the guard drops and takes any partial file with it
        tokio::fs::write(&scratch.path, bytes).await?;
        debug!(path = %scratch.path.display(), size = bytes.len(), "Scratch file written");

        Ok(scratch)
    }

    fn claim(dir: &Path, file_name: &str) -> AppResult<Self> {
        let name = Path::new(file_name).file_name().ok_or_else(|| {
            AppError::InvalidRequest(format!("invalid upload file name '{}'", file_name))
        })?;
        Ok(Self {
            path: dir.join(name),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tie the file's lifetime to `stream`: it is deleted once the stream is
    /// dropped, whether it finished, failed, or the client went away.
    pub fn attach<S>(self, stream: S) -> BoxStream<'static, S::Item>
    where
        S: Stream + Send + 'static,
    {
        stream
            .map(move |item| {
                let _owner = &self;
                item
            })
            .boxed()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        // a single unlink; Drop may also run after the runtime is gone
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Scratch file removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file"),
        }
    }
}
