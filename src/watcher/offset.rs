//! Persisted read position of the tailed log.

use std::path::{Path, PathBuf};

use super::error::TailError;

/// Text file holding the decimal byte offset of the last consumed line.
#[derive(Debug, Clone)]
pub struct OffsetStore {
    path: PathBuf,
}

impl OffsetStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored offset. A missing file reads as 0; unparsable
    /// content is logged and also reads as 0.
    pub async fn load(&self) -> Result<u64, TailError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => match content.trim().parse::<u64>() {
                Ok(offset) => Ok(offset),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        content = %content.trim(),
                        error = %e,
                        "Unparsable offset file, starting from 0"
                    );
                    Ok(0)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(self.offset_error(source)),
        }
    }

    /// Load the stored offset, creating the file with `0` when absent.
    pub async fn load_or_init(&self) -> Result<u64, TailError> {
        if tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| self.offset_error(e))?
        {
            self.load().await
        } else {
            self.save(0).await?;
            Ok(0)
        }
    }

    /// Persist `offset` by writing a sibling temporary file and renaming it
    /// over the store.
    pub async fn save(&self, offset: u64) -> Result<(), TailError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.offset_error(e))?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, format!("{offset}\n"))
            .await
            .map_err(|e| self.offset_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.offset_error(e))?;
        tracing::trace!(path = %self.path.display(), offset, "Saved offset");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn offset_error(&self, source: std::io::Error) -> TailError {
        TailError::OffsetFile {
            path: self.path.clone(),
            source,
        }
    }
}
