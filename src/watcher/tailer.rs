//! Incremental reader for the growing game log.
//!
//! Reads complete lines appended since the last read, survives rotation and
//! truncation, and optionally persists its position so a restart resumes
//! where the previous run stopped.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use futures_core::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::TailError;
use super::offset::OffsetStore;

/// Largest chunk consumed by a single read.
pub const MAX_READ_BYTES: u64 = 8 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Identity of the file behind the path, used to notice rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some(FileIdentity {
        dev: metadata.dev(),
        ino: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> Option<FileIdentity> {
    None
}

/// Incremental line reader that tracks its byte offset.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    /// Bytes consumed so far; decompressed bytes for gzip input.
    offset: u64,
    identity: Option<FileIdentity>,
    store: Option<OffsetStore>,
    /// Compressed length at the last gzip read that drained the stream.
    gzip_drained_len: Option<u64>,
}

impl LogTailer {
    /// Create a tailer starting at the beginning of the file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_offset(path, 0)
    }

    /// Create a tailer starting at a specific offset.
    #[must_use]
    pub fn with_offset(path: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
            identity: None,
            store: None,
            gzip_drained_len: None,
        }
    }

    /// Create a tailer positioned at the offset persisted in `store`, which
    /// is created with `0` when absent. Later reads keep the store updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset file cannot be read or created.
    pub async fn resume(path: impl Into<PathBuf>, store: OffsetStore) -> Result<Self, TailError> {
        let offset = store.load_or_init().await?;
        let mut tailer = Self::with_offset(path, offset);
        tracing::info!(
            path = %tailer.path.display(),
            offset,
            offset_file = %store.path().display(),
            "Resuming log tail"
        );
        tailer.store = Some(store);
        Ok(tailer)
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reset the offset to the beginning of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.gzip_drained_len = None;
    }

    /// Read complete lines appended since the last read.
    ///
    /// A trailing fragment without a newline is left unconsumed and returned
    /// once it is terminated. Line endings are trimmed, blank lines skipped
    /// and invalid UTF-8 replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened (missing, permission denied)
    /// - I/O errors occur during reading
    /// - The offset cannot be persisted
    ///
    /// Rotation and truncation restart from offset 0 and are not errors.
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, TailError> {
        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TailError::NotFound(self.path.clone()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(TailError::PermissionDenied(self.path.clone()));
            }
            Err(e) => return Err(TailError::Io(e)),
        };

        let metadata = file.metadata().await?;
        let identity = file_identity(&metadata);
        if let (Some(previous), Some(current)) = (self.identity, identity) {
            if previous != current {
                tracing::warn!(
                    path = %self.path.display(),
                    old_offset = self.offset,
                    "Log file replaced, restarting from 0"
                );
                self.reset();
            }
        }
        self.identity = identity;

        let file_len = metadata.len();
        let mut magic = [0u8; 2];
        if file_len >= 2 {
            file.read_exact(&mut magic).await?;
        }

        let chunk = if magic == GZIP_MAGIC {
            if self.gzip_drained_len == Some(file_len) {
                return Ok(Vec::new());
            }
            file.seek(std::io::SeekFrom::Start(0)).await?;
            let mut compressed = Vec::new();
            file.read_to_end(&mut compressed).await?;
            let chunk = self.read_gzip_chunk(&compressed)?;
            self.gzip_drained_len =
                ((chunk.len() as u64) < MAX_READ_BYTES).then_some(file_len);
            chunk
        } else {
            self.read_plain_chunk(&mut file, file_len).await?
        };

        let force = chunk.len() as u64 >= MAX_READ_BYTES;
        let (lines, consumed) = split_complete_lines(&chunk, force);
        if force && lines.len() == 1 && !chunk.contains(&b'\n') {
            tracing::warn!(
                path = %self.path.display(),
                bytes = chunk.len(),
                "Line exceeds read cap, emitting it unterminated"
            );
        }

        if consumed > 0 {
            self.offset += consumed as u64;
            if let Some(store) = &self.store {
                store.save(self.offset).await?;
            }
        }
        Ok(lines)
    }

    async fn read_plain_chunk(&mut self, file: &mut File, file_len: u64) -> Result<Vec<u8>, TailError> {
        if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "File truncated, resetting offset to 0"
            );
            self.offset = 0;
        }
        if file_len == self.offset {
            return Ok(Vec::new());
        }

        file.seek(std::io::SeekFrom::Start(self.offset)).await?;
        let want = (file_len - self.offset).min(MAX_READ_BYTES);
        let mut chunk = Vec::new();
        file.take(want).read_to_end(&mut chunk).await?;
        Ok(chunk)
    }

    /// Decompress whatever the file holds past the offset. A stream that is
    /// still being written ends early; the bytes before that point are kept.
    fn read_gzip_chunk(&mut self, compressed: &[u8]) -> Result<Vec<u8>, TailError> {
        let mut decoder = GzDecoder::new(compressed);
        let skipped = skip_available(&mut decoder, self.offset)?;
        if skipped < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = skipped,
                "Compressed log shorter than offset, resetting offset to 0"
            );
            self.offset = 0;
            decoder = GzDecoder::new(compressed);
        }
        let mut chunk = Vec::new();
        match decoder.take(MAX_READ_BYTES).read_to_end(&mut chunk) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                tracing::trace!(
                    path = %self.path.display(),
                    bytes = chunk.len(),
                    "Compressed log not finished yet"
                );
            }
            Err(e) => return Err(e.into()),
        }
        Ok(chunk)
    }

    /// Turn the tailer into an endless stream of lines, polling every
    /// `poll_interval` while no new data is available. Errors are yielded
    /// and polling continues.
    pub fn into_line_stream(
        self,
        poll_interval: Duration,
    ) -> impl Stream<Item = Result<String, TailError>> {
        futures_util::stream::unfold(
            (self, VecDeque::<String>::new()),
            move |(mut tailer, mut pending)| async move {
                loop {
                    if let Some(line) = pending.pop_front() {
                        return Some((Ok(line), (tailer, pending)));
                    }
                    match tailer.read_new_lines().await {
                        Ok(lines) if lines.is_empty() => tokio::time::sleep(poll_interval).await,
                        Ok(lines) => pending.extend(lines),
                        Err(e) => {
                            tokio::time::sleep(poll_interval).await;
                            return Some((Err(e), (tailer, pending)));
                        }
                    }
                }
            },
        )
    }
}

/// Discard up to `count` bytes, stopping early at the end of the data or of
/// an unfinished compressed stream. Returns the number of bytes discarded.
fn skip_available(reader: &mut impl Read, count: u64) -> std::io::Result<u64> {
    let mut buf = [0u8; 8192];
    let mut skipped = 0;
    while skipped < count {
        let want = usize::try_from(count - skipped).map_or(buf.len(), |n| n.min(buf.len()));
        match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => skipped += n as u64,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(skipped)
}

/// Split `chunk` into complete lines. Returns the lines and the number of
/// bytes consumed. With `force`, an unterminated chunk is consumed whole.
fn split_complete_lines(chunk: &[u8], force: bool) -> (Vec<String>, usize) {
    let end = match chunk.iter().rposition(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        None if force => chunk.len(),
        None => return (Vec::new(), 0),
    };

    let lines = chunk[..end]
        .split(|&b| b == b'\n')
        .map(|raw| raw.strip_suffix(b"\r").unwrap_or(raw))
        .filter(|raw| !raw.iter().all(u8::is_ascii_whitespace))
        .map(|raw| String::from_utf8_lossy(raw).into_owned())
        .collect();
    (lines, end)
}
